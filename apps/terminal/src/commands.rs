use crate::cli::{Command, IdeaArgs, WatchArgs};
use crate::files;
use crate::watch::{self, WatchOptions};
use anyhow::{bail, Context};
use chrono::Utc;
use ideaboard_core::board::{append_idea_to_store, status_counts, CategoryFilter, IdeaDraft};
use ideaboard_core::calendar::group_dated_ideas;
use ideaboard_core::config::AppConfig;
use ideaboard_core::db::Database;
use ideaboard_core::envelope;
use ideaboard_core::ideas::{format_local_timestamp, Idea, IdeaStatus};
use ideaboard_core::session::{
    ExportOutcome, ImportOutcome, LoadOutcome, PasswordPrompt, SaveOutcome, Session, SessionError,
};
use std::io::Write;
use std::path::Path;

/// Everything a board command needs from the outside world.
pub struct Host<'a> {
    pub db: &'a Database,
    pub config: &'a AppConfig,
    pub prompt: &'a mut dyn PasswordPrompt,
    pub out: &'a mut dyn Write,
}

fn draft_from_args(args: IdeaArgs) -> anyhow::Result<IdeaDraft> {
    let image = args
        .image
        .as_deref()
        .map(files::image_data_url)
        .transpose()?;
    Ok(IdeaDraft {
        title: args.title,
        description: args.description,
        status: args.status.into(),
        category: args.category,
        image,
        date: args.date,
        notify: !args.no_notify,
    })
}

fn describe(idea: &Idea) -> String {
    let mut line = format!("{}  {}  [{}]", idea.id, idea.title, idea.category);
    if let Some(due) = idea.due_at() {
        line.push_str(&format!("  @ {}", format_local_timestamp(due)));
        if idea.wants_notification() {
            line.push_str(" (reminder)");
        }
    }
    if idea.image.is_some() {
        line.push_str(" (image)");
    }
    line
}

impl Host<'_> {
    pub fn dispatch(&mut self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Add(args) => self.add(args),
            Command::List { category } => self.list(&category),
            Command::Edit { id, idea } => self.edit(&id, idea),
            Command::Delete { id } => self.delete(&id),
            Command::Toggle { id } => self.toggle(&id),
            Command::Notify { id, state } => self.notify(&id, state.is_on()),
            Command::Theme => self.theme(),
            Command::Categories => self.categories(),
            Command::Share { out } => self.share(&out),
            Command::Open { file } => self.open(&file),
            Command::Calendar => self.calendar(),
            Command::Watch(args) => self.watch(&args),
            Command::QuickAdd(args) => self.quick_add(args),
            Command::Config { .. } => bail!("config is handled before the board is opened"),
        }
    }

    fn open_session(&mut self) -> anyhow::Result<Session> {
        let (session, outcome) = Session::load(self.db, &mut *self.prompt);
        match outcome {
            LoadOutcome::Cancelled => writeln!(
                self.out,
                "No password entered; the protected board stays locked."
            )?,
            LoadOutcome::Rejected => writeln!(self.out, "Incorrect password.")?,
            LoadOutcome::Corrupt(reason) => {
                writeln!(self.out, "The stored board could not be read: {reason}")?
            }
            LoadOutcome::Fresh | LoadOutcome::Restored | LoadOutcome::Unsealed => {}
        }
        Ok(session)
    }

    /// A session that changes can be saved to.
    fn open_writable(&mut self) -> anyhow::Result<Session> {
        let session = self.open_session()?;
        if session.is_writable() {
            return Ok(session);
        }
        if session.is_protected() {
            bail!("the board is locked; unlock it with its password before changing it");
        }
        bail!("the stored board could not be read; it was left untouched")
    }

    fn persist(&mut self, session: &Session) -> anyhow::Result<()> {
        match session.save(self.db) {
            SaveOutcome::Written => Ok(()),
            SaveOutcome::Skipped => {
                writeln!(self.out, "The board is locked; changes were not saved.")?;
                Ok(())
            }
            SaveOutcome::Failed(reason) => bail!("failed to save the board: {reason}"),
        }
    }

    fn add(&mut self, args: IdeaArgs) -> anyhow::Result<()> {
        let draft = draft_from_args(args)?;
        let mut session = self.open_writable()?;
        let id = session.add_idea(draft, Utc::now())?.id.clone();
        self.persist(&session)?;
        writeln!(self.out, "Added idea {id}.")?;
        Ok(())
    }

    fn edit(&mut self, id: &str, args: IdeaArgs) -> anyhow::Result<()> {
        let draft = draft_from_args(args)?;
        let mut session = self.open_writable()?;
        session.update_idea(id, draft)?;
        self.persist(&session)?;
        writeln!(self.out, "Updated idea {id}.")?;
        Ok(())
    }

    fn delete(&mut self, id: &str) -> anyhow::Result<()> {
        let mut session = self.open_writable()?;
        let removed = session.delete_idea(id)?;
        self.persist(&session)?;
        writeln!(self.out, "Deleted \"{}\".", removed.title)?;
        Ok(())
    }

    fn toggle(&mut self, id: &str) -> anyhow::Result<()> {
        let mut session = self.open_writable()?;
        let status = session.toggle_status(id)?;
        self.persist(&session)?;
        writeln!(self.out, "Idea {id} is now {}.", status.as_str())?;
        Ok(())
    }

    fn notify(&mut self, id: &str, enabled: bool) -> anyhow::Result<()> {
        let mut session = self.open_writable()?;
        session.set_notify(id, enabled)?;
        self.persist(&session)?;
        let state = if enabled { "on" } else { "off" };
        writeln!(self.out, "Reminder for idea {id} turned {state}.")?;
        Ok(())
    }

    fn theme(&mut self) -> anyhow::Result<()> {
        let mut session = self.open_writable()?;
        let theme = session.toggle_theme();
        self.persist(&session)?;
        writeln!(self.out, "Theme set to {}.", theme.as_str())?;
        Ok(())
    }

    fn list(&mut self, category: &str) -> anyhow::Result<()> {
        let session = self.open_session()?;
        if session.is_protected() {
            writeln!(self.out, "Shared board (password protected)")?;
        }
        let filter = CategoryFilter::parse(category);
        let ideas = session.filtered_ideas(&filter);
        let counts = status_counts(ideas.iter().copied());

        for (status, heading, count) in [
            (IdeaStatus::Progress, "In progress", counts.progress),
            (IdeaStatus::Paused, "Paused", counts.paused),
        ] {
            writeln!(self.out, "{heading} ({count})")?;
            for idea in ideas.iter().filter(|idea| idea.status == status) {
                writeln!(self.out, "  {}", describe(idea))?;
                if !idea.description.is_empty() {
                    writeln!(self.out, "      {}", idea.description)?;
                }
            }
        }
        Ok(())
    }

    fn categories(&mut self) -> anyhow::Result<()> {
        let session = self.open_session()?;
        for category in session.categories() {
            writeln!(self.out, "{category}")?;
        }
        Ok(())
    }

    fn calendar(&mut self) -> anyhow::Result<()> {
        let session = self.open_session()?;
        let groups = group_dated_ideas(session.ideas());
        if groups.is_empty() {
            writeln!(self.out, "No scheduled ideas.")?;
            return Ok(());
        }
        for (group, ideas) in groups.sections() {
            writeln!(self.out, "{}", group.label())?;
            for idea in ideas {
                let when = idea
                    .due_at()
                    .map(format_local_timestamp)
                    .unwrap_or_default();
                writeln!(self.out, "  {when}  {}", idea.title)?;
            }
        }
        Ok(())
    }

    fn share(&mut self, out_path: &Path) -> anyhow::Result<()> {
        let session = self.open_session()?;
        match session.export_shared(&mut *self.prompt) {
            Ok(ExportOutcome::Sealed {
                envelope: sealed,
                count,
            }) => {
                files::write_envelope(out_path, &sealed)?;
                writeln!(
                    self.out,
                    "Exported {count} shared idea(s) to {} (fingerprint {}).",
                    out_path.display(),
                    envelope::fingerprint(&sealed)
                )?;
            }
            Ok(ExportOutcome::Cancelled) => writeln!(self.out, "Export cancelled.")?,
            Err(SessionError::Precondition(reason)) => {
                writeln!(self.out, "Nothing to share: {reason}.")?
            }
            Err(err) => return Err(err).context("export failed"),
        }
        Ok(())
    }

    fn open(&mut self, file: &Path) -> anyhow::Result<()> {
        let text = files::read_envelope(file)?;
        let mut session = self.open_session()?;
        match session.import_shared(&text, &mut *self.prompt) {
            Ok(ImportOutcome::Imported { count }) => {
                self.persist(&session)?;
                writeln!(
                    self.out,
                    "Opened shared board with {count} idea(s); it is now password protected."
                )?;
            }
            Ok(ImportOutcome::Cancelled) => {
                writeln!(self.out, "Import cancelled; the board is unchanged.")?
            }
            Err(SessionError::Authentication) => writeln!(
                self.out,
                "Incorrect password or damaged file; the board is unchanged."
            )?,
            Err(SessionError::Format(reason)) => {
                writeln!(self.out, "Not a shared board file: {reason}")?
            }
            Err(err) => return Err(err).context("import failed"),
        }
        Ok(())
    }

    fn watch(&mut self, args: &WatchArgs) -> anyhow::Result<()> {
        let options = WatchOptions::resolve(self.config, args);
        let session = self.open_session()?;
        watch::run(self.db, session, options, &mut *self.out)
    }

    fn quick_add(&mut self, args: IdeaArgs) -> anyhow::Result<()> {
        let draft = draft_from_args(args)?;
        let idea = append_idea_to_store(self.db, draft, Utc::now())?;
        writeln!(self.out, "Added idea {}.", idea.id)?;
        Ok(())
    }
}

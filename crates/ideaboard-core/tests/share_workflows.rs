use chrono::{Duration, SecondsFormat, TimeZone, Utc};
use ideaboard_core::app;
use ideaboard_core::board::{append_idea_to_store, IdeaDraft};
use ideaboard_core::db::Database;
use ideaboard_core::ideas::SHARED_CATEGORY;
use ideaboard_core::notifications::NotificationCenter;
use ideaboard_core::reminders::ReminderScheduler;
use ideaboard_core::session::{
    ExportOutcome, ImportOutcome, LoadOutcome, SaveOutcome, Session, SessionError, SessionMode,
};
use tempfile::tempdir;

fn setup_db() -> Database {
    let db = Database::new_in_memory().expect("db init");
    db.run_migrations().expect("migrations");
    db
}

fn answer(value: &'static str) -> impl FnMut(&str) -> Option<String> {
    move |_message: &str| Some(value.to_string())
}

fn dismiss() -> impl FnMut(&str) -> Option<String> {
    |_message: &str| None
}

fn shared_draft(title: &str) -> IdeaDraft {
    IdeaDraft {
        category: Some(SHARED_CATEGORY.to_string()),
        ..IdeaDraft::new(title)
    }
}

#[test]
fn export_then_import_on_another_board() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    // Author board with one shared and one private idea
    let author_db = setup_db();
    let mut author = Session::new();
    author
        .add_idea(shared_draft("Team picnic"), now)
        .expect("add shared");
    author
        .add_idea(IdeaDraft::new("Private diary"), now)
        .expect("add private");
    assert_eq!(author.save(&author_db), SaveOutcome::Written);

    let ExportOutcome::Sealed { envelope, count } = author
        .export_shared(&mut answer("team-secret"))
        .expect("export")
    else {
        panic!("export was cancelled");
    };
    assert_eq!(count, 1);
    assert_eq!(author.mode(), SessionMode::Normal);

    // Recipient opens the artifact
    let recipient_db = setup_db();
    let (mut recipient, outcome) = Session::load(&recipient_db, &mut dismiss());
    assert_eq!(outcome, LoadOutcome::Fresh);
    let imported = recipient
        .import_shared(&envelope, &mut answer("team-secret"))
        .expect("import");
    assert_eq!(imported, ImportOutcome::Imported { count: 1 });
    assert_eq!(recipient.ideas()[0].title, "Team picnic");
    assert!(recipient.is_protected());
    assert_eq!(recipient.save(&recipient_db), SaveOutcome::Written);

    // Next start asks for the password and restores the sealed board
    let (reopened, outcome) = Session::load(&recipient_db, &mut answer("team-secret"));
    assert_eq!(outcome, LoadOutcome::Unsealed);
    assert_eq!(reopened.ideas().len(), 1);
    assert!(reopened.has_password());

    // A wrong password leaves the board empty and the stored root intact
    let stored = recipient_db.read_board_root().expect("read");
    let (locked, outcome) = Session::load(&recipient_db, &mut answer("guess"));
    assert_eq!(outcome, LoadOutcome::Rejected);
    assert!(locked.ideas().is_empty());
    assert_eq!(locked.save(&recipient_db), SaveOutcome::Skipped);
    assert_eq!(recipient_db.read_board_root().expect("read"), stored);
}

#[test]
fn import_with_wrong_password_keeps_current_board() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let mut author = Session::new();
    author.add_idea(shared_draft("Shared"), now).expect("add");
    let ExportOutcome::Sealed { envelope, .. } =
        author.export_shared(&mut answer("right")).expect("export")
    else {
        panic!("export was cancelled");
    };

    let mut board = Session::new();
    board.add_idea(IdeaDraft::new("Mine"), now).expect("add");
    let err = board
        .import_shared(&envelope, &mut answer("wrong"))
        .expect_err("wrong password");
    assert!(matches!(err, SessionError::Authentication));
    assert_eq!(board.ideas()[0].title, "Mine");
    assert_eq!(board.mode(), SessionMode::Normal);
}

#[test]
fn quick_add_shows_up_on_next_load() {
    let dir = tempdir().expect("tempdir");
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    {
        let db = app::open_board_database(dir.path()).expect("open");
        let mut session = Session::new();
        session.add_idea(IdeaDraft::new("From the board"), now).expect("add");
        session.save(&db);
    }
    {
        let db = app::open_board_database(dir.path()).expect("reopen");
        append_idea_to_store(&db, IdeaDraft::new("From the extension"), now).expect("quick add");
    }

    let db = app::open_board_database(dir.path()).expect("reopen");
    let (session, outcome) = Session::load(&db, &mut dismiss());
    assert_eq!(outcome, LoadOutcome::Restored);
    let titles: Vec<&str> = session.ideas().iter().map(|idea| idea.title.as_str()).collect();
    assert_eq!(titles, vec!["From the board", "From the extension"]);
    assert_ne!(session.ideas()[0].id, session.ideas()[1].id);
}

#[test]
fn scheduled_idea_raises_one_notification() {
    let due = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
    let mut session = Session::new();
    let draft = IdeaDraft {
        description: "Bring the speaker".to_string(),
        date: Some(due.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ..IdeaDraft::new("Party")
    };
    session.add_idea(draft, due - Duration::days(1)).expect("add");

    let mut scheduler = ReminderScheduler::for_period(1_000).expect("scheduler");
    let mut center = NotificationCenter::new();
    let mut toasts = Vec::new();
    for offset in -2..8 {
        let events = scheduler.tick_ideas(session.ideas(), due + Duration::seconds(offset));
        let mut sink = |item: &ideaboard_core::notifications::NotificationItem| {
            toasts.push(item.title.clone())
        };
        center.raise_reminders(&events, &mut sink);
    }

    assert_eq!(toasts, vec!["It's time! Party"]);
    assert_eq!(center.unread_count(), 1);
    assert_eq!(center.items()[0].details.as_deref(), Some("Bring the speaker"));
}

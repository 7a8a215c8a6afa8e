fn main() -> anyhow::Result<()> {
    ideaboard_lib::run()
}

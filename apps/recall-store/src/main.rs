fn main() -> anyhow::Result<()> {
    recall_store::run()
}

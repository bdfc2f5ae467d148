// Represents a subcommand of qrgen.
pub trait Tool {
    // The contribution of this tool to the qrgen CLI. The clap::Command
    // returned here will be set up as a subcommand on the qrgen binary.
    fn cli() -> clap::Command;

    // Run the tool. Everything the tool needs should come in through the
    // cli above.
    fn execute(&self) -> anyhow::Result<Option<Output>>;
}

#[derive(Debug)]
pub enum Output {
    Bytes(Vec<u8>),
    Text(String),
    JsonValue(serde_json::Value),
}

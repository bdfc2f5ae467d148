use crate::form::PRESETS;
use crate::tool::{Output, Tool};
use anyhow::{Context, Result};
use clap::{Command, CommandFactory, Parser};

#[derive(Parser, Debug)]
#[command(name = "presets", about = "List the sample values offered by the form")]
pub struct PresetsTool {}

impl Tool for PresetsTool {
    fn cli() -> Command {
        PresetsTool::command()
    }

    fn execute(&self) -> Result<Option<Output>> {
        let value = serde_json::to_value(PRESETS).context("Could not serialize presets")?;
        Ok(Some(Output::JsonValue(value)))
    }
}

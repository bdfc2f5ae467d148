use crate::args::TextInput;
use crate::logging;
use crate::qr::capability::capability;
use crate::qr::controller::RenderController;
use crate::qr::encoder::RenderRequest;
use crate::qr::export::ExportService;
use crate::qr::logo::LogoSlot;
use crate::qr::settings::{RenderArgs, RenderSettings};
use crate::tool::{Output, Tool};
use anyhow::{Context, Result, bail};
use clap::{ArgAction, Command, CommandFactory, Parser};
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "render", about = "Render text as a QR code")]
pub struct RenderTool {
    /// The text or URL to encode ("-" reads from stdin)
    text: TextInput,

    /// Save QR code to file (PNG format), "-" writes the PNG to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log more details to stderr, repeat for even more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    render: RenderArgs,
}

impl Tool for RenderTool {
    fn cli() -> Command {
        RenderTool::command()
    }

    fn execute(&self) -> Result<Option<Output>> {
        logging::to_stderr(self.verbose)?;
        self.run()
    }
}

impl RenderTool {
    fn run(&self) -> Result<Option<Output>> {
        let settings = RenderSettings::from(&self.render);

        let Some(output) = &self.output else {
            // Display in terminal
            let request = RenderRequest::for_input(self.text.as_ref(), &settings);
            let matrix = capability()
                .matrix(&request.text, request.level)
                .context("Failed to generate QR code")?;

            return Ok(Some(Output::Text(matrix.to_terminal())));
        };

        if self.text.is_empty() {
            bail!("Nothing to export, the text is empty");
        }

        let logo = match &settings.logo {
            Some(path) => LogoSlot::load(path),
            None => LogoSlot::Absent,
        };

        let mut controller = RenderController::from_settings(settings).with_logo(logo);
        controller.set_text(self.text.as_ref());
        controller.pump();

        if let Some(err) = controller.failure() {
            bail!("Failed to generate QR code: {err}");
        }

        if output == Path::new("-") {
            let bytes =
                ExportService::encode_png(controller.bitmap()).context("Failed to encode PNG")?;
            return Ok(Some(Output::Bytes(bytes)));
        }

        ExportService::write_to(output, controller.bitmap())
            .context("Failed to save QR code image")?;

        let (width, height) = controller.bitmap().dimensions();
        Ok(Some(Output::JsonValue(json!({
            "path": output.display().to_string(),
            "width": width,
            "height": height,
            "level": controller.settings().level,
            "logo": controller.logo().image().is_some(),
        }))))
    }
}

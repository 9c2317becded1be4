use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use ctv::color::{ColorGenerator, Palette, RandomColor};
use ctv::controller::Controller;
use ctv::domain::{CTVConfig, CTVError};
use ctv::logging;
use ctv::model::{Model, Status};
use ctv::source::{FetchProvider, FileSource, GraphQlSource};
use ctv::ui::TableUI;

fn main() -> ExitCode {
    let cfg = CTVConfig::parse();
    if let Err(e) = logging::init(&cfg.log_file) {
        eprintln!("Error: could not set up logging: {e}");
        return ExitCode::FAILURE;
    }

    let result = run(&cfg);
    ratatui::restore();
    match result {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(cfg: &CTVConfig) -> Result<(), CTVError> {
    info!("Starting ctv with {cfg:?}");

    let provider: Arc<dyn FetchProvider> = match &cfg.path {
        Some(path) => Arc::new(FileSource::new(path)),
        None => Arc::new(GraphQlSource::new(cfg.endpoint.clone())),
    };
    let colors: Box<dyn ColorGenerator> = match cfg.seed {
        Some(seed) => Box::new(RandomColor::seeded(Palette::default(), seed)),
        None => Box::new(RandomColor::new(Palette::default())),
    };

    let mut model = Model::init(cfg, provider, colors)?;
    let mut ui = TableUI::new(cfg);
    let controller = Controller::new(cfg);

    let mut terminal = ratatui::init();

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message. Without one the model still
        // picks up finished fetches.
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    Ok(())
}

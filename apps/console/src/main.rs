mod commands;
mod config;
mod render;

use std::{
    io::{self, Write as _},
    path::PathBuf,
    sync::Arc,
};

use ai_gateway::GeminiGateway;
use anyhow::{Context, Result};
use clap::Parser;
use client_core::{progress, TransitionError, Workflow, WorkflowEvent};
use shared::messages::Locale;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast, watch},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::Command;

/// Turns today's headlines into AI-rendered images and short clips.
#[derive(Parser, Debug)]
#[command(name = "news-canvas")]
struct Args {
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// zh-tw or en; overrides the config file and APP__LOCALE.
    #[arg(long)]
    locale: Option<Locale>,
    #[arg(long)]
    export_dir: Option<PathBuf>,
    #[arg(long)]
    base_url: Option<String>,
}

enum Flow {
    Render,
    Quiet,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings(&args.config)?;
    if let Some(locale) = args.locale {
        settings.locale = locale;
    }
    if let Some(dir) = args.export_dir {
        settings.export_dir = dir;
    }
    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }

    let gateway_config = settings.to_gateway_config();
    info!(config = ?gateway_config, "starting news canvas");
    if gateway_config.api_key.is_none() {
        warn!("no API key configured; set GEMINI_API_KEY before fetching");
    }
    let gateway =
        GeminiGateway::new(gateway_config).context("failed to set up the AI gateway client")?;
    let mut workflow = Workflow::new(Arc::new(gateway), settings.locale);

    tokio::spawn(print_progress(workflow.progress()));
    tokio::spawn(announce_busy_stages(workflow.subscribe()));

    print!("{}", render::render(workflow.state(), 0.0));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match execute(&mut workflow, command, &settings).await {
            Ok(Flow::Render) => {
                print!("{}", render::render(workflow.state(), *workflow.progress().borrow()))
            }
            Ok(Flow::Quiet) => {}
            Ok(Flow::Quit) => break,
            Err(err) => println!("{err:#}"),
        }
    }

    info!("bye");
    Ok(())
}

async fn execute(
    workflow: &mut Workflow<GeminiGateway>,
    command: Command,
    settings: &config::Settings,
) -> Result<Flow> {
    match command {
        Command::Fetch => {
            workflow.fetch_news().await?;
        }
        Command::Toggle(id) => {
            workflow.toggle_selection(id)?;
        }
        Command::Proceed(mode) => {
            workflow.proceed_to_prompts(mode).await?;
        }
        Command::EditPrompt(item_id) => workflow.begin_edit_prompt(&item_id)?,
        Command::SetPrompt { field, text } => {
            let item_id = workflow
                .state()
                .prompt_edit
                .as_ref()
                .map(|edit| edit.item_id.clone())
                .ok_or(TransitionError::NoPromptEdit)?;
            workflow.edit_prompt_text(&item_id, field, text)?;
        }
        Command::Save => workflow.save_prompt()?,
        Command::Cancel => {
            if workflow.state().media_edit.is_some() {
                workflow.cancel_edit_media()?;
            } else {
                workflow.cancel_edit_prompt()?;
            }
        }
        Command::Style(style) => workflow.select_style(style)?,
        Command::Language(language) => workflow.select_language(language)?,
        Command::Generate => {
            workflow.generate_media().await?;
        }
        Command::EditImage(item_id) => workflow.start_edit_media(&item_id)?,
        Command::Instruct(text) => workflow.set_edit_instruction(text)?,
        Command::Apply => {
            workflow.confirm_edit_media().await?;
        }
        Command::Export(item_id) => {
            let path = workflow
                .export_media(&item_id, &settings.export_dir)
                .await?;
            println!("saved {}", path.display());
            return Ok(Flow::Quiet);
        }
        Command::Back => workflow.go_back_to_news()?,
        Command::Reset => {
            if workflow.state().error.is_some() {
                workflow.dismiss_error();
            } else {
                workflow.reset();
            }
        }
        Command::State => {
            println!("{}", workflow.snapshot_json()?);
            return Ok(Flow::Quiet);
        }
        Command::Help => {
            println!("{}", commands::HELP);
            print!("{}", render::style_menu(workflow.state().style));
            return Ok(Flow::Quiet);
        }
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Render)
}

/// Redraws a progress bar on stderr while a render or edit is in flight.
async fn print_progress(mut progress: watch::Receiver<f32>) {
    let mut drawing = false;
    while progress.changed().await.is_ok() {
        let value = *progress.borrow_and_update();
        if value > 0.0 && value < progress::COMPLETE {
            eprint!("\r{}", render::progress_bar(value));
            drawing = true;
        } else if drawing {
            eprintln!("\r{}", render::progress_bar(value));
            drawing = false;
        }
    }
}

async fn announce_busy_stages(mut events: broadcast::Receiver<WorkflowEvent>) {
    loop {
        match events.recv().await {
            Ok(WorkflowEvent::StageChanged { to, .. }) if to.is_busy() => println!("== {to} =="),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "stage announcements lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

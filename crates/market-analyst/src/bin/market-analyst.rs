//! Market Analyst CLI
//!
//! Browse sectors, print candlestick series and chat with an assistant
//! grounded in live data for the selected stock.
//!
//! # Usage
//!
//! ```bash
//! export GEMINI_API_KEY="..."          # or ANALYST_LLM_PROVIDER=openai + OPENAI_API_KEY
//!
//! market-analyst sectors
//! market-analyst chart --sector Technology --symbol NVDA --timeframe 1y
//! market-analyst chat --sector Finance
//! ```

use analyst_utils::{LogConfig, init_tracing};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use market_analyst::conversation::ChatUpdate;
use market_analyst::render::{catalog_table, chart_error, series_report, transcript_text};
use market_analyst::{
    AnalystConfig, AssetSelection, ChatMessage, ConversationManager, ModelClient,
    ModelProviderKind, SectorCatalog, SeriesNormalizer, Timeframe, Transcript, YahooFinanceClient,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "market-analyst", version, about = "Sector browser, candlestick series and a grounded market chat")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Load sectors from a JSON file instead of the built-in catalog
    #[arg(long, global = true, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Language model provider (openai, anthropic, gemini)
    #[arg(long, global = true)]
    provider: Option<ModelProviderKind>,

    /// Model name
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// Sector to start in
    #[arg(long, default_value = "Technology")]
    sector: String,

    /// Symbol within the sector (defaults to the sector's first symbol)
    #[arg(long)]
    symbol: Option<String>,

    /// Chart timeframe: 1d, 5d, 1mo, 3mo, 1y, 5y
    #[arg(long, short, default_value = "1d")]
    timeframe: Timeframe,

    /// Bars shown in a chart table
    #[arg(long, default_value_t = 30)]
    rows: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List sectors and their symbols
    Sectors,
    /// Fetch and print a candlestick series
    Chart(SelectionArgs),
    /// Interactive chat about the selected stock
    Chat(SelectionArgs),
}

fn print_help() {
    println!(
        r"
Commands:
  /sector <name>     switch sector (resets the asset to its first symbol)
  /asset <symbol>    switch asset within the current sector
  /timeframe <tok>   1d, 5d, 1mo, 3mo, 1y or 5y
  /chart             show the chart for the current selection
  /sectors           list sectors and symbols
  /history           print the conversation so far
  /help              show this help
  /exit              quit

Anything else is a question about the selected stock.
"
    );
}

fn select(catalog: &SectorCatalog, args: &SelectionArgs) -> anyhow::Result<AssetSelection> {
    let mut selection = catalog.select(&args.sector)?;
    if let Some(symbol) = &args.symbol {
        selection.change_symbol(catalog, symbol)?;
    }
    Ok(selection)
}

async fn show_chart(normalizer: &SeriesNormalizer, symbol: &str, timeframe: Timeframe, rows: usize) {
    match normalizer.fetch_series(symbol, timeframe).await {
        Ok(series) => println!("{}\n", series_report(&series, rows)),
        Err(e) => println!("{}\n", chart_error(symbol, timeframe, &e)),
    }
}

struct Session {
    catalog: SectorCatalog,
    selection: AssetSelection,
    timeframe: Timeframe,
    rows: usize,
    transcript: Transcript,
    normalizer: SeriesNormalizer,
    manager: ConversationManager,
}

impl Session {
    fn prompt(&self) -> String {
        format!("[{} {} {}]> ", self.selection.sector(), self.selection.symbol(), self.timeframe.label())
    }

    async fn chart(&self) {
        show_chart(&self.normalizer, self.selection.symbol(), self.timeframe, self.rows).await;
    }

    async fn chat(&mut self, message: Option<ChatMessage>) {
        let update = self
            .manager
            .on_chat_event(message, &self.transcript, self.selection.symbol())
            .await;
        if let ChatUpdate::Replace(transcript) = update {
            self.transcript = transcript;
            if let Some(reply) = self.transcript.last() {
                println!("Analyst: {}\n", reply.content);
            }
        }
    }

    /// Returns `false` when the user asked to leave
    async fn handle(&mut self, input: &str) -> bool {
        let (command, arg) = match input.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (input, ""),
        };

        match command {
            "/exit" | "/quit" => return false,
            "/help" => print_help(),
            "/sectors" => println!("{}\n", catalog_table(&self.catalog, Some(&self.selection))),
            "/history" => println!("{}\n", transcript_text(&self.transcript)),
            "/chart" => self.chart().await,
            "/sector" => match self.selection.change_sector(&self.catalog, arg) {
                Ok(()) => self.chart().await,
                Err(e) => eprintln!("Error: {e}\n"),
            },
            "/asset" => match self.selection.change_symbol(&self.catalog, arg) {
                Ok(()) => self.chart().await,
                Err(e) => eprintln!("Error: {e}\n"),
            },
            "/timeframe" => match arg.parse::<Timeframe>() {
                Ok(timeframe) => {
                    self.timeframe = timeframe;
                    self.chart().await;
                }
                Err(e) => eprintln!("Error: {e}\n"),
            },
            other if other.starts_with('/') => {
                eprintln!("Unknown command: {other} (try /help)\n");
            }
            _ => self.chat(Some(ChatMessage::user(input))).await,
        }
        true
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env();
    if cli.json_logs {
        log_config = log_config.json(true);
    }
    init_tracing(&log_config)?;

    let mut builder = AnalystConfig::builder();
    if let Some(provider) = cli.provider {
        builder = builder.model_provider(provider);
    }
    if let Some(model) = cli.model {
        builder = builder.model(model);
    }
    let config = builder.with_env()?.build()?;

    let catalog = match &cli.catalog {
        Some(path) => SectorCatalog::from_file(path)?,
        None => SectorCatalog::builtin(),
    };

    match cli.command {
        Command::Sectors => {
            println!("{}", catalog_table(&catalog, None));
        }
        Command::Chart(args) => {
            let selection = select(&catalog, &args)?;
            let market = Arc::new(YahooFinanceClient::new(config.request_timeout));
            let normalizer = SeriesNormalizer::new(market, &config);
            show_chart(&normalizer, selection.symbol(), args.timeframe, args.rows).await;
        }
        Command::Chat(args) => {
            let selection = select(&catalog, &args)?;
            let market = Arc::new(YahooFinanceClient::new(config.request_timeout));
            let model = ModelClient::from_env(&config)
                .with_context(|| format!("cannot set up the {} model provider", config.model_provider))?;

            println!("Market Analyst ({} via {})", model.model(), model.provider_name());
            println!("Type /help for commands.\n");

            let mut session = Session {
                catalog,
                selection,
                timeframe: args.timeframe,
                rows: args.rows,
                transcript: Transcript::new(),
                normalizer: SeriesNormalizer::new(market.clone(), &config),
                manager: ConversationManager::new(market, model, &config)?,
            };

            session.chart().await;
            session.chat(None).await;

            let stdin = io::stdin();
            let mut stdout = io::stdout();
            loop {
                print!("{}", session.prompt());
                stdout.flush()?;

                let mut input = String::new();
                match stdin.lock().read_line(&mut input) {
                    Ok(0) => {
                        println!("\nGoodbye!");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        eprintln!("Error reading input: {e}");
                        continue;
                    }
                }

                let input = input.trim();
                if input.is_empty() {
                    continue;
                }
                if !session.handle(input).await {
                    println!("Goodbye!");
                    break;
                }
            }
        }
    }

    Ok(())
}

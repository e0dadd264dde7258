//! Matrix API CLI - validate and reduce CSV square matrices
//!
//! # Main Commands
//!
//! ```bash
//! matrix-api serve                      # Start HTTP server (port 8080)
//! matrix-api serve --strategy serial    # Same, one blocking pass per request
//! ```
//!
//! # Local Commands
//!
//! ```bash
//! matrix-api echo matrix.csv            # Re-render as CSV
//! matrix-api invert matrix.csv --json   # Transpose, as JSON rows
//! matrix-api sum matrix.csv             # Sum of all cells
//! matrix-api multiply matrix.csv        # Product of all cells
//! matrix-api flatten matrix.csv         # Cells on one line
//! ```

use clap::{Parser, Subcommand};
use matrix_api::api::logs::log_error;
use matrix_api::{
    load_matrix_file, Matrix, MatrixProcessor, SerialMatrixService, ServerConfig, Strategy,
    StreamingMatrixService,
};
use std::fs::File;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "matrix-api")]
#[command(about = "Validate and reduce CSV square matrices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (default: MATRIX_API_PORT or 8080)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<IpAddr>,

        /// Processing strategy for flatten, sum and multiply
        #[arg(short, long, value_enum)]
        strategy: Option<Strategy>,

        /// Values the streaming producer may run ahead of its consumer
        #[arg(long)]
        channel_capacity: Option<usize>,
    },

    /// Print the matrix back as CSV
    Echo {
        /// Input CSV file
        input: PathBuf,

        /// Output JSON rows instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Print the transposed matrix
    Invert {
        /// Input CSV file
        input: PathBuf,

        /// Output JSON rows instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Print all cells on one line, comma separated
    Flatten {
        /// Input CSV file
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Strategy::default())]
        strategy: Strategy,
    },

    /// Print the sum of all cells
    Sum {
        /// Input CSV file
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Strategy::default())]
        strategy: Strategy,
    },

    /// Print the product of all cells
    Multiply {
        /// Input CSV file
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Strategy::default())]
        strategy: Strategy,
    },
}

#[derive(Clone, Copy)]
enum Reduction {
    Flatten,
    Sum,
    Multiply,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            port,
            host,
            strategy,
            channel_capacity,
        } => cmd_serve(port, host, strategy, channel_capacity).await,

        Commands::Echo { input, json } => cmd_render(&input, json, |m| m.clone()),

        Commands::Invert { input, json } => cmd_render(&input, json, Matrix::transpose),

        Commands::Flatten { input, strategy } => {
            cmd_reduce(&input, strategy, Reduction::Flatten).await
        }

        Commands::Sum { input, strategy } => cmd_reduce(&input, strategy, Reduction::Sum).await,

        Commands::Multiply { input, strategy } => {
            cmd_reduce(&input, strategy, Reduction::Multiply).await
        }
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

async fn cmd_serve(
    port: Option<u16>,
    host: Option<IpAddr>,
    strategy: Option<Strategy>,
    channel_capacity: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(strategy) = strategy {
        config.strategy = strategy;
    }
    if let Some(capacity) = channel_capacity {
        config.channel_capacity = capacity;
    }

    matrix_api::server::start_server(config.normalized()).await?;
    Ok(())
}

fn cmd_render(
    input: &Path,
    json: bool,
    shape: impl FnOnce(&Matrix) -> Matrix,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Loading: {}", input.display());

    let matrix = load_matrix_file(input)?;
    eprintln!("   {}x{} matrix", matrix.num_rows(), matrix.num_cols());

    let shaped = shape(&matrix);
    if json {
        println!("{}", serde_json::to_string_pretty(&shaped)?);
    } else {
        println!("{}", matrix_api::echo(&shaped));
    }
    Ok(())
}

async fn cmd_reduce(
    input: &Path,
    strategy: Strategy,
    reduction: Reduction,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {} ({})", input.display(), strategy);

    let output = match strategy {
        Strategy::Serial => run_reduction(&SerialMatrixService::new(), input, reduction).await?,
        Strategy::Streaming => {
            run_reduction(&StreamingMatrixService::default(), input, reduction).await?
        }
    };

    println!("{}", output);
    Ok(())
}

async fn run_reduction<S: MatrixProcessor>(
    service: &S,
    input: &Path,
    reduction: Reduction,
) -> Result<String, Box<dyn std::error::Error>> {
    let file = File::open(input).map_err(|_| matrix_api::MatrixError::FileError)?;
    let output = match reduction {
        Reduction::Flatten => service.flatten(file).await?,
        Reduction::Sum => service.sum(file).await?.to_string(),
        Reduction::Multiply => service.multiply(file).await?.to_string(),
    };
    Ok(output)
}

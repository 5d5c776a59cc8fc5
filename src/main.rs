use call_decorators::call::Call;
use call_decorators::clock::{Clock, ManualClock, SystemClock};
use call_decorators::config::{Args, Command, TickerArgs};
use call_decorators::rate_limit::RateLimiter;
use call_decorators::state::{AppState, TICKER};
use call_decorators::{demo, handlers, logging};
use clap::Parser; // for cli
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

type BoxError = Box<dyn Error + Send + Sync>;

// this is main async function with tokio
#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // parse cli arguments
    let args = Args::parse();
    logging::init(&args.log_level, args.json_logs)?;

    match args.command {
        Command::Demo { ticker } => run_demo(&ticker),
        Command::Serve { port, ticker } => serve(port, &ticker).await,
    }
}

fn run_demo(ticker: &TickerArgs) -> Result<(), BoxError> {
    println!("== role guard");
    demo::role_demo();

    println!("== error boundary");
    demo::error_demo();

    println!("== type validator");
    demo::type_demo();

    println!("== result cache");
    demo::cache_demo();

    println!("== rate limiter");
    let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
    let limiter = RateLimiter::from_settings(ticker.limiter_settings(), clock.clone())?;
    let step = chrono::Duration::milliseconds(i64::try_from(ticker.interval_ms)?);
    let report = demo::ticker_demo(&limiter, &clock, ticker.iterations, step);
    println!("{} ticks ran, {} suppressed", report.ran, report.suppressed);
    Ok(())
}

async fn serve(port: u16, ticker: &TickerArgs) -> Result<(), BoxError> {
    let limiter = RateLimiter::from_settings(ticker.limiter_settings(), Arc::new(SystemClock))?;
    let state = Arc::new(AppState::new(limiter));

    // spawn the rate-limited ticker
    let ticker_state = Arc::clone(&state);
    let interval = Duration::from_millis(ticker.interval_ms.max(1));
    let iterations = ticker.iterations;
    tokio::spawn(async move {
        run_ticker(ticker_state, interval, iterations).await;
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(port, "serving /health and /metrics");
    info!(
        rate_limit = ticker.rate_limit,
        window_scheme = ?ticker.window_scheme,
        "ticker limited per window"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_ticker(state: Arc<AppState>, every: Duration, iterations: u64) {
    let print_second = state.limiter.wrap(TICKER, |()| {
        println!("{}", SystemClock.now().format("%S"));
    });
    let mut interval = tokio::time::interval(every);

    let mut ticks = 0u64;
    while iterations == 0 || ticks < iterations {
        interval.tick().await;
        state.record_tick(print_second.call(()).is_some());
        ticks += 1;
    }
    info!(ticks, "ticker finished");
}

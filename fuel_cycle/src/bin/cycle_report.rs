//! Cycle report - phase, backtest and forecast summary for a price CSV
//!
//! Usage:
//!   cargo run --bin cycle_report -- --csv prices.csv --optimize --save
//!   cargo run --bin cycle_report -- --csv prices.csv --wholesale 165.2

use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, ValueEnum};
use fuel_cycle::backtest::{Backtester, DEFAULT_GROUND_TRUTH_THRESHOLD, DEFAULT_LOOKAHEAD_DAYS};
use fuel_cycle::config::ConfigStore;
use fuel_cycle::cycle::CycleAnalyzer;
use fuel_cycle::data::{
    load_observations_csv, DailyPrice, DailySeriesBuilder, PriceObservation, TimestampRule,
};
use fuel_cycle::error::Result;
use fuel_cycle::market::{cross_station_volatility, profile_stations, wholesale_trend};
use fuel_cycle::models::{
    CycleShapeForecaster, ForecastContext, ForecastModel, HikeRegression, HorizonForecaster,
    DEFAULT_HORIZON_DAYS,
};
use fuel_cycle::optimizer::ThresholdOptimizer;
use fuel_cycle::phase::{
    CycleOutlook, ElapsedTimeModel, MarginModel, MarketSignals, PhasePredictor,
};
use fuel_cycle::savings::{FillContext, SavingsCalculator};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TimestampArg {
    Reported,
    Scraped,
    Prefer,
}

impl From<TimestampArg> for TimestampRule {
    fn from(arg: TimestampArg) -> Self {
        match arg {
            TimestampArg::Reported => TimestampRule::ReportedAt,
            TimestampArg::Scraped => TimestampRule::ScrapedAt,
            TimestampArg::Prefer => TimestampRule::PreferReported,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ForecastBackend {
    /// Parametric cycle-shape simulation
    Shape,
    /// Classifier and regressor trained on the loaded history
    Regression,
}

#[derive(Parser, Debug)]
#[command(name = "cycle_report")]
#[command(about = "Report the fuel price cycle phase, backtest accuracy and forecast")]
struct Args {
    /// Station price CSV
    #[arg(long)]
    csv: PathBuf,

    /// Algorithm config file
    #[arg(long, default_value = "algo_config.json")]
    config: PathBuf,

    /// Which timestamp column dates each row
    #[arg(long, value_enum, default_value = "prefer")]
    timestamp: TimestampArg,

    /// Days ahead a HIKE signal has to be confirmed within
    #[arg(long, default_value_t = DEFAULT_LOOKAHEAD_DAYS)]
    lookahead: usize,

    /// Future rise (cpl) that counts as a real hike
    #[arg(long, default_value_t = DEFAULT_GROUND_TRUTH_THRESHOLD)]
    ground_truth: f64,

    /// Search for a better hike threshold
    #[arg(long)]
    optimize: bool,

    /// Save the recommended threshold when the search improves on it
    #[arg(long, requires = "optimize")]
    save: bool,

    /// Wholesale reference (cpl); enables the margin model and the forecast
    #[arg(long)]
    wholesale: Option<f64>,

    /// Previous day's wholesale reference (cpl), for the wholesale trend
    #[arg(long, requires = "wholesale")]
    wholesale_prev: Option<f64>,

    /// Forecast horizon in days
    #[arg(long, default_value_t = DEFAULT_HORIZON_DAYS)]
    horizon: usize,

    /// Forecasting backend
    #[arg(long, value_enum, default_value = "shape")]
    model: ForecastBackend,

    /// Tank size (litres) for the savings estimate
    #[arg(long, default_value_t = 50)]
    tank: u32,

    /// Print per-station pricing profiles
    #[arg(long)]
    stations: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let store = ConfigStore::new(&args.config);
    let config = store.load();
    let hike_threshold = config.hike_threshold;

    let builder = DailySeriesBuilder::new().with_timestamp_rule(args.timestamp.into());
    let raw = load_observations_csv(&args.csv, builder.timestamp_rule())?;
    let observations = builder.filter_observations(&raw);
    let series = builder.build(&observations);
    info!(
        rows = raw.len(),
        observations = observations.len(),
        days = series.len(),
        "loaded price history"
    );

    let Some(latest) = series.last().copied() else {
        warn!(path = %args.csv.display(), "no usable prices found");
        return Ok(());
    };

    let analyzer = CycleAnalyzer::default();
    let today = Local::now().date_naive();
    let outlook =
        CycleOutlook::evaluate(&analyzer, &ElapsedTimeModel, &series, hike_threshold, today);

    println!("=== Cycle ===");
    println!("Latest median:     {:.1}c on {}", latest.price_cpl, latest.date);
    println!("Hike threshold:    {}c", hike_threshold);
    println!("Avg cycle length:  {:.1} days", outlook.stats.avg_cycle_length_days);
    println!("Avg relenting:     {:.1} days", outlook.stats.avg_relenting_days);
    println!("Last hike:         {}", outlook.stats.last_hike_date);
    println!("Next hike (est.):  {}", outlook.next_hike_estimate);
    println!(
        "Status:            {} - {} ({} days elapsed)",
        outlook.status.status, outlook.status.advice, outlook.status.days_elapsed
    );

    let backtester = Backtester::new(analyzer, hike_threshold);
    println!("\n=== Backtest ===");
    match backtester.run(&series, args.lookahead, args.ground_truth, None) {
        Some(report) => println!("{}", report.metrics),
        None => println!("Not enough history to backtest"),
    }

    if args.optimize {
        let outcome = ThresholdOptimizer::new(backtester)
            .with_lookahead(args.lookahead)
            .optimize(&series, args.ground_truth, &config);
        println!("\n=== Optimization ===");
        println!("{}", outcome.message);

        if args.save && outcome.improved {
            store.save(&outcome.recommended)?;
            println!(
                "Saved threshold {}c to {}",
                outcome.recommended.hike_threshold,
                store.path().display()
            );
        }
    }

    if let Some(wholesale) = args.wholesale {
        let (current, previous) = last_two_days(&observations);
        let wholesale_days: Vec<DailyPrice> = args
            .wholesale_prev
            .map(|prev| DailyPrice::new(latest.date - Duration::days(1), prev))
            .into_iter()
            .chain(std::iter::once(DailyPrice::new(latest.date, wholesale)))
            .collect();
        let signals = MarketSignals {
            current_median_price: latest.price_cpl,
            wholesale_reference_price: wholesale,
            days_elapsed: outlook.status.days_elapsed,
            wholesale_trend_delta: wholesale_trend(&wholesale_days),
            cross_station_volatility: cross_station_volatility(&current, &previous),
        };
        let model = MarginModel::default();
        let status = model.predict(&signals);

        println!("\n=== Market ({}) ===", model.name());
        println!(
            "Status: {} - {} (margin {:.1}c, hike probability {:.0}%)",
            status.status,
            status.advice,
            status.margin.unwrap_or(f64::NAN),
            status.hike_probability.unwrap_or(0.0) * 100.0
        );

        let context = ForecastContext {
            wholesale_reference: wholesale,
            days_since_last_hike: outlook.status.days_elapsed,
            current_status: status.status,
            cycle_length_days: outlook.stats.avg_cycle_length_days,
        };
        let forecaster: Box<dyn HorizonForecaster> = match args.model {
            ForecastBackend::Shape => Box::new(CycleShapeForecaster::default()),
            ForecastBackend::Regression => Box::new(HikeRegression::default().train(&series)?),
        };
        let forecast = forecaster.predict_horizon(&series, &context, args.horizon)?;

        println!("\n=== Forecast ({}) ===", forecaster.name());
        for point in &forecast.points {
            println!(
                "{}  {:>6.1}c  {:>3.0}%  {:?}",
                point.date,
                point.predicted_price,
                point.hike_probability * 100.0,
                point.trend
            );
        }

        let predicted_bottom = forecast
            .points
            .iter()
            .map(|p| p.predicted_price)
            .fold(latest.price_cpl, f64::min);
        let today_prices: Vec<f64> = current.iter().map(|o| o.price_cpl).collect();
        let market_average = cycle_math::mean(&today_prices).unwrap_or(latest.price_cpl);
        let best_local = today_prices.iter().copied().fold(market_average, f64::min);

        let fill = FillContext::new(
            market_average,
            best_local,
            status.status.into(),
            predicted_bottom,
            args.tank,
        );
        let savings = SavingsCalculator::new(fill)?.report();

        println!("\n=== Savings ({}) ===", savings.leg);
        println!("Best local vs average: ${:.2}", savings.immediate_saving_dollars);
        println!("Cycle opportunity:     ${:.2}", savings.opportunity_dollars);
        println!("Yearly benchmark:      ${:.2}", savings.projected_annual_saving);
        println!("{}", savings.recommendation);
    }

    if args.stations {
        println!("\n=== Stations ===");
        for profile in profile_stations(&observations) {
            println!(
                "{:<12} {:>+6.1}c  {:?}",
                profile.station_id, profile.mean_deviation, profile.strategy
            );
        }
    }

    Ok(())
}

type DaySnapshot = Vec<PriceObservation>;

/// Observations from the latest and the previous observed day
fn last_two_days(observations: &[PriceObservation]) -> (DaySnapshot, DaySnapshot) {
    let mut days: Vec<NaiveDate> = observations.iter().map(|o| o.date()).collect();
    days.sort_unstable();
    days.dedup();

    let pick = |day: NaiveDate| -> DaySnapshot {
        observations
            .iter()
            .filter(|o| o.date() == day)
            .cloned()
            .collect()
    };

    match days.as_slice() {
        [.., prev, last] => (pick(*last), pick(*prev)),
        _ => (Vec::new(), Vec::new()),
    }
}

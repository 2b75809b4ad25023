use bi_analytics::quality::QualityRule;
use bi_analytics::{
    DataLoader, DataQualityChecker, ForecastEngine, KpiCalculator, ModelSpec, TrendAnalyzer,
    TrendConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::io::Write;
use tempfile::{Builder, NamedTempFile};

// Two years of weekly revenue with a mild upward drift
fn create_sample_data() -> NamedTempFile {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
    let mut rng = StdRng::seed_from_u64(17);
    let noise = Normal::new(0.0, 25.0).unwrap();

    writeln!(file, "week,revenue,visitors,orders").unwrap();
    let start = chrono::NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    for i in 0..104u64 {
        let date = start + chrono::Days::new(7 * i);
        let revenue = 1000.0 + 4.0 * i as f64 + noise.sample(&mut rng);
        let visitors = 4000 + (i * 13) % 300;
        let orders = 80 + (i * 7) % 20;
        writeln!(
            file,
            "{},{:.2},{},{}",
            date.format("%Y-%m-%d"),
            revenue,
            visitors,
            orders
        )
        .unwrap();
    }

    file
}

#[test]
fn test_full_analysis_workflow() {
    // 1. Load the raw table and check it
    let data_file = create_sample_data();
    let raw = DataLoader::load(data_file.path(), None, None).unwrap();
    assert_eq!(raw.height(), 104);

    let quality = DataQualityChecker::validate(
        &raw,
        &["no_nulls", "valid_dates", "positive_amounts", "unique_rows"],
    )
    .unwrap();
    assert!(quality.passed(), "{:?}", quality);
    assert!(quality.outcome(QualityRule::ValidDates).unwrap().passed);

    // 2. KPIs over the raw periods
    let kpis = KpiCalculator::new(Some(raw.clone()));
    let growth = kpis.revenue_growth("week", "revenue", None).unwrap();
    assert_eq!(growth.height(), 104);
    let conversion = kpis
        .conversion_rate("week", "visitors", "orders", None)
        .unwrap();
    assert_eq!(conversion.width(), 4);

    // 3. Trends on the date-indexed revenue
    let mut trends = TrendAnalyzer::default();
    trends.load(raw.clone(), Some("week"), Some("revenue")).unwrap();
    let report = trends.analyze(None, &TrendConfig::default()).unwrap();
    assert_eq!(report.decomposition.map(|d| d.period), Some(52));

    // 4. Forecast the next quarter and score it against itself
    let mut engine = ForecastEngine::new();
    engine.load(raw, Some("week"), Some("revenue")).unwrap();
    engine.train(ModelSpec::arima(None)).unwrap();
    let forecast = engine.forecast(13, None).unwrap().clone();
    assert_eq!(forecast.len(), 13);

    let metrics = engine.evaluate(&forecast.values).unwrap();
    assert_eq!(metrics.mse, 0.0);
}

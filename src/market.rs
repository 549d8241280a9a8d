//! # Simulated Market Data
//! Stand-in for a real market-data backend: randomized price history with a
//! forecast tail, fixed trade signals, a fixed RL performance fixture, and
//! the raw headline feed the news agent analyzes. Everything here is
//! simulated for the educational dashboard; there is no ingestion.

use chrono::{Duration, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::news::RawHeadline;

pub const HISTORY_DAYS: usize = 60;
pub const FORECAST_DAYS: usize = 10;

const STARTING_PRICE: f64 = 150.0;
const PRICE_FLOOR: f64 = 100.0;

/// One daily point. Past days carry `price`; the forecast tail carries only
/// `forecast` (no actual close exists for future dates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Buy,
    Sell,
}

/// A discrete buy/sell event from the (simulated) classification model,
/// with an educational reason string for the hover panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub date: String,
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub price: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RlPerformance {
    pub profit_or_loss: f64,
    pub trades: u32,
    pub win_rate: f64,
}

/// 60 daily closes ending today (random walk from 150, floored at 100),
/// followed by a 10-day forecast tail with a slight upward drift.
pub fn mock_price_history() -> Vec<PricePoint> {
    let today = Utc::now().date_naive();
    let mut rng = rand::rng();
    let mut data = Vec::with_capacity(HISTORY_DAYS + FORECAST_DAYS);

    let mut price = STARTING_PRICE;
    for i in (1..=HISTORY_DAYS).rev() {
        price += rng.random_range(-0.5..0.5) * 5.0;
        price = price.max(PRICE_FLOOR);
        data.push(PricePoint {
            date: date_string(today, -(i as i64)),
            price: Some(round2(price)),
            forecast: None,
        });
    }

    let mut last = price;
    for i in 1..=FORECAST_DAYS {
        last += (rng.random_range(0.0..1.0) - 0.45) * 3.0;
        data.push(PricePoint {
            date: date_string(today, i as i64),
            price: None,
            forecast: Some(round2(last)),
        });
    }

    data
}

/// Fixed signals from the (simulated) classification model.
pub fn mock_trade_signals() -> Vec<TradeSignal> {
    let today = Utc::now().date_naive();
    vec![
        TradeSignal {
            date: date_string(today, -45),
            kind: SignalKind::Buy,
            price: 145.12,
            reason: "Random Forest model detected a bullish divergence in RSI and MACD \
                     indicators, suggesting upward momentum."
                .to_string(),
        },
        TradeSignal {
            date: date_string(today, -28),
            kind: SignalKind::Sell,
            price: 162.78,
            reason: "Price crossed below the 50-day moving average with high volume, a \
                     bearish signal confirmed by the model."
                .to_string(),
        },
        TradeSignal {
            date: date_string(today, -10),
            kind: SignalKind::Buy,
            price: 155.45,
            reason: "Model identified a consolidation breakout pattern, predicting a \
                     potential rally."
                .to_string(),
        },
    ]
}

pub fn mock_rl_performance() -> RlPerformance {
    RlPerformance {
        profit_or_loss: 1245.67,
        trades: 42,
        win_rate: 64.2,
    }
}

/// Raw headlines for the news agent to analyze.
pub fn mock_raw_headlines() -> Vec<RawHeadline> {
    [
        (
            "Tech Giant 'Orange' Unveils New AI Chip, Stock Jumps 5%",
            "MarketWatch",
        ),
        (
            "Federal Reserve Hints at Pausing Interest Rate Hikes",
            "Reuters",
        ),
        (
            "Supply Chain Issues Continue to Plague Auto Manufacturers",
            "Bloomberg",
        ),
        (
            "Orange's Competitor 'Pear' Reports Disappointing Earnings",
            "WSJ",
        ),
        (
            "Consumer Confidence Index Sees Unexpected Drop This Month",
            "Associated Press",
        ),
    ]
    .into_iter()
    .map(|(headline, source)| RawHeadline {
        headline: headline.to_string(),
        source: source.to_string(),
    })
    .collect()
}

fn date_string(today: NaiveDate, offset_days: i64) -> String {
    (today + Duration::days(offset_days))
        .format("%Y-%m-%d")
        .to_string()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

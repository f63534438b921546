use anyhow::{Context, Result};
use chrono::Utc;
use listing_ranking::{models::decode_listings, Config, GeoPoint, RankingPipeline, ViewerContext};
use std::io::{self, Read};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the ranked JSON
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().context("Failed to load config")?;

    let mut nearby = false;
    let mut path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--nearby" => nearby = true,
            _ => path = Some(arg),
        }
    }

    let payload = match &path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read listings from {}", path))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read listings from stdin")?;
            buf
        }
    };
    let rows: serde_json::Value =
        serde_json::from_str(&payload).context("Listings payload is not valid JSON")?;
    let listings = decode_listings(rows);

    let offset = config.ranking.utc_offset()?;
    let viewer = ViewerContext::new(viewer_location(), Utc::now().with_timezone(&offset));

    info!(
        service = %config.service.service_name,
        listings = listings.len(),
        has_location = viewer.location.is_some(),
        nearby = nearby,
        "Ranking listings"
    );

    let pipeline = RankingPipeline::new(&config.ranking);
    let stdout = io::stdout().lock();
    if nearby {
        serde_json::to_writer_pretty(stdout, &pipeline.nearby(&listings, &viewer))?;
    } else {
        serde_json::to_writer_pretty(stdout, &pipeline.rank(&listings, &viewer))?;
    }
    println!();

    Ok(())
}

/// `VIEWER_LATITUDE` / `VIEWER_LONGITUDE`, both or neither
fn viewer_location() -> Option<GeoPoint> {
    let read = |key: &str| std::env::var(key).ok().map(|v| (v.trim().parse::<f64>(), v));

    match (read("VIEWER_LATITUDE"), read("VIEWER_LONGITUDE")) {
        (Some((Ok(lat), _)), Some((Ok(lng), _))) if lat.is_finite() && lng.is_finite() => {
            Some(GeoPoint::new(lat, lng))
        }
        (None, None) => None,
        (lat, lng) => {
            warn!(
                latitude = ?lat.map(|(_, raw)| raw),
                longitude = ?lng.map(|(_, raw)| raw),
                "Ignoring incomplete or invalid viewer location"
            );
            None
        }
    }
}

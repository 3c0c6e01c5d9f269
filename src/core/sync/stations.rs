//! Shared default stations
//!
//! Recreated after each music pass from the radio configuration. Shared
//! stations of a managed type that are no longer configured are removed.

use anyhow::Result;
use tracing::info;

use crate::config::MusicConfig;
use crate::core::media::Media;
use crate::db::StationTable;
use crate::models::station::{SHARED_USER, TYPE_GENRE, TYPE_OTHER, TYPE_PERIOD, TYPE_STREAM};
use crate::models::Station;

pub const TOP_TRACKS: &str = "Top Tracks";

fn search_ref(query: &str) -> String {
    let params = serde_urlencoded::to_string([("q", query), ("radio", "1")]).unwrap_or_default();
    format!("/music/search?{}", params)
}

fn shared(station_type: &str, name: &str, reference: String) -> Station {
    Station {
        user: SHARED_USER.to_string(),
        shared: true,
        station_type: station_type.to_string(),
        name: name.to_string(),
        reference,
        ..Default::default()
    }
}

/// Stations implied by the music configuration
pub fn default_stations(config: &MusicConfig) -> Result<Vec<Station>> {
    let mut stations = Vec::new();

    for genre in &config.radio_genres {
        stations.push(shared(
            TYPE_GENRE,
            genre,
            search_ref(&format!("+genre:\"{}\"", genre)),
        ));
    }

    for period in &config.radio_periods {
        stations.push(shared(
            TYPE_PERIOD,
            &period.name,
            search_ref(&format!(
                "+date:>={}-01-01 +date:<={}-12-31",
                period.start, period.end
            )),
        ));
    }

    stations.push(shared(TYPE_OTHER, TOP_TRACKS, search_ref("+popularity:<=3")));

    for stream in &config.radio_streams {
        let mut station = shared(TYPE_STREAM, &stream.name, serde_json::to_string(&stream.sources)?);
        station.creator = stream.creator.clone();
        station.image = stream.image.clone();
        station.description = stream.description.clone();
        stations.push(station);
    }

    Ok(stations)
}

/// Upsert the default stations and prune stale shared ones
pub async fn sync_stations(media: &Media) -> Result<usize> {
    let db = media.db();
    let stations = default_stations(&media.config().music)?;

    for station in &stations {
        StationTable::upsert(db, station).await?;
    }

    let mut pruned = 0;
    for station_type in [TYPE_GENRE, TYPE_PERIOD, TYPE_STREAM, TYPE_OTHER] {
        let keep: Vec<String> = stations
            .iter()
            .filter(|s| s.station_type == station_type)
            .map(|s| s.name.clone())
            .collect();
        pruned += StationTable::prune_shared(db, station_type, &keep).await?;
    }

    info!(
        "stations for {}: {} current, {} pruned",
        media.name(),
        stations.len(),
        pruned
    );
    Ok(stations.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RadioPeriod, RadioStream, StreamSource};
    use crate::core::media::tests::test_media;

    fn config() -> Config {
        let mut config = Config::default();
        config.music.radio_genres = vec!["rock".to_string(), "hip hop".to_string()];
        config.music.radio_periods = vec![RadioPeriod {
            name: "80s".to_string(),
            start: 1980,
            end: 1989,
        }];
        config.music.radio_streams = vec![RadioStream {
            name: "KEXP".to_string(),
            sources: vec![StreamSource {
                content_type: "audio/aac".to_string(),
                url: "https://example.com/kexp.aac".to_string(),
            }],
            ..Default::default()
        }];
        config
    }

    #[test]
    fn test_default_station_refs() {
        let stations = default_stations(&config().music).unwrap();
        assert_eq!(stations.len(), 5);
        assert_eq!(
            stations[1].reference,
            "/music/search?q=%2Bgenre%3A%22hip+hop%22&radio=1"
        );
        assert!(stations[2].reference.contains("1980-01-01"));
        assert_eq!(stations[3].name, TOP_TRACKS);
        assert!(stations[4].reference.starts_with("[{\"contentType\""));
    }

    #[tokio::test]
    async fn test_sync_prunes_removed_genres() {
        let media = test_media(config(), None).await;
        assert_eq!(sync_stations(&media).await.unwrap(), 5);

        let mut smaller = config();
        smaller.music.radio_genres.truncate(1);
        let smaller = crate::core::media::Media::assemble("test", smaller, media.db().clone(), vec![])
            .await
            .unwrap();
        sync_stations(&smaller).await.unwrap();

        let names: Vec<String> = StationTable::for_user(media.db(), "alice")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert!(names.contains(&"rock".to_string()));
        assert!(!names.contains(&"hip hop".to_string()));
    }
}

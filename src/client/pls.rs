//! PLS (INI style) stream playlists

use anyhow::{anyhow, Result};
use reqwest::Client;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlsEntry {
    pub file: String,
    pub title: String,
    /// Seconds, -1 for live streams
    pub length: i64,
}

/// Parse a `[playlist]` section into ordered entries
pub fn parse_pls(text: &str) -> Result<Vec<PlsEntry>> {
    let mut in_playlist = false;
    let mut entries: BTreeMap<u32, PlsEntry> = BTreeMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            in_playlist = line.eq_ignore_ascii_case("[playlist]");
            continue;
        }
        if !in_playlist {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        let (field, index) = match ["file", "title", "length"]
            .iter()
            .find(|f| key.starts_with(**f))
        {
            Some(field) => (*field, key[field.len()..].parse::<u32>().ok()),
            None => continue,
        };
        let Some(index) = index else { continue };

        let entry = entries.entry(index).or_insert_with(|| PlsEntry {
            length: -1,
            ..Default::default()
        });
        match field {
            "file" => entry.file = value.to_string(),
            "title" => entry.title = value.to_string(),
            _ => entry.length = value.parse().unwrap_or(-1),
        }
    }

    if !in_playlist && entries.is_empty() {
        return Err(anyhow!("not a pls playlist"));
    }

    Ok(entries
        .into_values()
        .filter(|e| !e.file.is_empty())
        .collect())
}

pub async fn fetch_pls(client: &Client, url: &str) -> Result<Vec<PlsEntry>> {
    let text = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    parse_pls(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pls() {
        let text = "[playlist]\nNumberOfEntries=2\nFile2=http://ice2.example.com/radio.aac\nTitle2=Backup\nFile1=http://ice1.example.com/radio.mp3\nTitle1=Radio One\nLength1=-1\nVersion=2\n";
        let entries = parse_pls(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].file, "http://ice1.example.com/radio.mp3");
        assert_eq!(entries[0].title, "Radio One");
        assert_eq!(entries[0].length, -1);
        assert_eq!(entries[1].title, "Backup");
    }

    #[test]
    fn test_not_pls() {
        assert!(parse_pls("<html></html>").is_err());
    }
}

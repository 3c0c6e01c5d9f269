//! Parsers for media file naming conventions

use once_cell::sync::Lazy;
use regex::Regex;

static MOVIE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?) \((\d{4})\)(?: - ([^/]+?))?\.(mkv|mp4)$").unwrap()
});

static EPISODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?) \((\d{4})\) S(\d{1,3})E(\d{1,4})(?: - ([^/]+?))?\.(mkv|mp4)$").unwrap()
});

static MUSIC_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|/)([^/]+)/([^/]+)/([^/]+)$").unwrap());

static DISC_TRACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2})-(\d{2,3})-(.+)\.(mp3|flac|ogg|oga|opus|m4a|aac|wav)$").unwrap()
});

static TRACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+)-(.+)\.(mp3|flac|ogg|oga|opus|m4a|aac|wav)$").unwrap()
});

static RELEASE_DIR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)(?: \((\d{4})\))?$").unwrap());

/// `<title> (<year>)[ - <quality>].(mkv|mp4)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieFile {
    pub title: String,
    pub year: i32,
    pub quality: Option<String>,
}

/// `<series> (<year>) S<nn>E<nn>[ - <title>].(mkv|mp4)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeFile {
    pub series: String,
    pub year: i32,
    pub season: i32,
    pub episode: i32,
    pub title: Option<String>,
}

/// `<artist>/<release>/<track#>-<title>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFile {
    pub artist: String,
    pub release: String,
    pub release_year: Option<i32>,
    pub disc: i32,
    pub track: i32,
    pub title: String,
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Parse a movie file name (directories are ignored)
pub fn parse_movie(path: &str) -> Option<MovieFile> {
    let caps = MOVIE_RE.captures(basename(path))?;
    Some(MovieFile {
        title: caps[1].trim().to_string(),
        year: caps[2].parse().ok()?,
        quality: caps.get(3).map(|m| m.as_str().to_string()),
    })
}

/// Parse a TV episode file name (directories are ignored)
pub fn parse_episode(path: &str) -> Option<EpisodeFile> {
    let caps = EPISODE_RE.captures(basename(path))?;
    Some(EpisodeFile {
        series: caps[1].trim().to_string(),
        year: caps[2].parse().ok()?,
        season: caps[3].parse().ok()?,
        episode: caps[4].parse().ok()?,
        title: caps.get(5).map(|m| m.as_str().to_string()),
    })
}

/// Parse a music path; only the last three components are significant.
pub fn parse_track(path: &str) -> Option<TrackFile> {
    let caps = MUSIC_PATH_RE.captures(path)?;
    let artist = caps[1].trim().to_string();
    let release_dir = caps[2].trim();
    let file = &caps[3];

    let rel = RELEASE_DIR_RE.captures(release_dir)?;
    let release = rel[1].trim().to_string();
    let release_year = rel.get(2).and_then(|m| m.as_str().parse().ok());

    let (disc, track, title) = if let Some(c) = DISC_TRACK_RE.captures(file) {
        (c[1].parse().ok()?, c[2].parse().ok()?, c[3].trim().to_string())
    } else if let Some(c) = TRACK_RE.captures(file) {
        (1, c[1].parse().ok()?, c[2].trim().to_string())
    } else {
        return None;
    };

    if artist.is_empty() || release.is_empty() || title.is_empty() {
        return None;
    }

    Some(TrackFile {
        artist,
        release,
        release_year,
        disc,
        track,
        title,
    })
}

/// Extension of a key, lowercased
pub fn extension(key: &str) -> Option<String> {
    let name = basename(key);
    name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// True for locations that point straight at an audio stream
pub fn is_audio_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    [".mp3", ".aac", ".ogg", ".flac"]
        .iter()
        .any(|ext| path.ends_with(ext))
}

/// True for `.pls` playlist URLs
pub fn is_pls_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    path.ends_with(".pls")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_movie() {
        let m = parse_movie("movies/Heat (1995).mkv").unwrap();
        assert_eq!(m.title, "Heat");
        assert_eq!(m.year, 1995);
        assert_eq!(m.quality, None);

        let m = parse_movie("The Thing (1982) - HD.mp4").unwrap();
        assert_eq!(m.title, "The Thing");
        assert_eq!(m.quality.as_deref(), Some("HD"));

        assert!(parse_movie("Heat.mkv").is_none());
        assert!(parse_movie("Heat (1995).avi").is_none());
    }

    #[test]
    fn test_parse_episode() {
        let e = parse_episode("tv/Lost (2004) S01E02 - Pilot (2).mkv").unwrap();
        assert_eq!(e.series, "Lost");
        assert_eq!(e.year, 2004);
        assert_eq!(e.season, 1);
        assert_eq!(e.episode, 2);
        assert_eq!(e.title.as_deref(), Some("Pilot (2)"));

        let e = parse_episode("The Office (2005) S02E10.mp4").unwrap();
        assert_eq!(e.series, "The Office");
        assert_eq!(e.title, None);

        assert!(parse_episode("The Office S02E10.mp4").is_none());
    }

    #[test]
    fn test_parse_track() {
        let t = parse_track("Music/Radiohead/OK Computer (1997)/03-Subterranean Homesick Alien.flac")
            .unwrap();
        assert_eq!(t.artist, "Radiohead");
        assert_eq!(t.release, "OK Computer");
        assert_eq!(t.release_year, Some(1997));
        assert_eq!(t.disc, 1);
        assert_eq!(t.track, 3);
        assert_eq!(t.title, "Subterranean Homesick Alien");

        let t = parse_track("Pink Floyd/The Wall/2-05-Comfortably Numb.mp3").unwrap();
        assert_eq!(t.disc, 2);
        assert_eq!(t.track, 5);
        assert_eq!(t.release_year, None);

        assert!(parse_track("Pink Floyd/cover.jpg").is_none());
        assert!(parse_track("Pink Floyd/The Wall/notes.txt").is_none());
    }

    #[test]
    fn test_url_kinds() {
        assert!(is_audio_url("http://radio.example/stream.mp3?x=1"));
        assert!(is_audio_url("https://example/live.AAC"));
        assert!(!is_audio_url("https://example/listen.pls"));
        assert!(is_pls_url("https://example/listen.pls"));
        assert_eq!(extension("a/b/c.FLAC").as_deref(), Some("flac"));
    }
}

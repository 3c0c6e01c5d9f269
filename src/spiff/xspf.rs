//! XSPF (XML) encoding

use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use super::Spiff;

const XSPF_NS: &str = "http://xspf.org/ns/0/";

/// Encode a resolved playlist as XSPF.
///
/// Locations are written as given; callers substitute direct URLs first.
pub fn encode_xspf(spiff: &Spiff) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("playlist");
    root.push_attribute(("version", "1"));
    root.push_attribute(("xmlns", XSPF_NS));
    writer.write_event(Event::Start(root))?;

    let playlist = &spiff.playlist;
    text_element(&mut writer, "title", &playlist.title)?;
    text_element(&mut writer, "creator", &playlist.creator)?;
    text_element(&mut writer, "image", &playlist.image)?;
    text_element(&mut writer, "location", &playlist.location)?;
    text_element(&mut writer, "date", &playlist.date)?;

    writer.write_event(Event::Start(BytesStart::new("trackList")))?;
    for entry in &playlist.entries {
        writer.write_event(Event::Start(BytesStart::new("track")))?;
        for location in &entry.location {
            text_element(&mut writer, "location", location)?;
        }
        for identifier in &entry.identifier {
            text_element(&mut writer, "identifier", identifier)?;
        }
        text_element(&mut writer, "title", &entry.title)?;
        text_element(&mut writer, "creator", &entry.creator)?;
        text_element(&mut writer, "album", &entry.album)?;
        text_element(&mut writer, "image", &entry.image)?;
        writer.write_event(Event::End(BytesEnd::new("track")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("trackList")))?;
    writer.write_event(Event::End(BytesEnd::new("playlist")))?;

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

fn text_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    writer
        .create_element(name)
        .write_text_content(BytesText::new(value))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spiff::{Entry, PlaylistType};

    #[test]
    fn test_encode() {
        let mut spiff = Spiff::new(PlaylistType::Music, "Rock & Roll");
        spiff.playlist.entries.push(Entry {
            creator: "Chuck Berry".to_string(),
            album: "Berry Is on Top".to_string(),
            title: "Johnny B. Goode".to_string(),
            location: vec!["https://bucket.example/a.flac?sig=1&x=2".to_string()],
            identifier: vec!["etag1".to_string()],
            size: vec![1000],
            ..Default::default()
        });

        let xml = encode_xspf(&spiff).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<playlist version=\"1\" xmlns=\"http://xspf.org/ns/0/\">"));
        assert!(xml.contains("<title>Rock &amp; Roll</title>"));
        assert!(xml.contains("<location>https://bucket.example/a.flac?sig=1&amp;x=2</location>"));
        assert!(xml.contains("<identifier>etag1</identifier>"));
        assert!(!xml.contains("<image>"));
        assert!(xml.trim_end().ends_with("</playlist>"));
    }
}

use serde::Deserialize;
use utility::serde::default_if_empty;

/// One row of the railroads' `notes.txt` timetable footnotes.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteRow {
    #[serde(rename = "note_id")]
    pub id: String,

    #[serde(rename = "note_mark", default, deserialize_with = "default_if_empty")]
    pub mark: String,

    #[serde(rename = "note_title", default, deserialize_with = "default_if_empty")]
    pub title: String,

    #[serde(rename = "note_desc", default, deserialize_with = "default_if_empty")]
    pub description: String,
}

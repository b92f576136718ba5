use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use sqlx::FromRow;
use time::{
    format_description::FormatItem, macros::format_description, PrimitiveDateTime, UtcOffset,
};

use crate::util::coerce;

/// A medal as provided by the catalog endpoint.
///
/// Fields are kept as raw JSON values since the endpoint is loose with its
/// types; see [`Medal::from_raw`] for how they are interpreted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawMedal {
    #[serde(rename = "MedalID")]
    pub medal_id: Value,
    #[serde(rename = "Name")]
    pub name: Value,
    #[serde(rename = "Link")]
    pub link: Value,
    #[serde(rename = "Description")]
    pub description: Value,
    #[serde(rename = "Restriction")]
    pub restriction: Value,
    #[serde(rename = "Grouping")]
    pub grouping: Value,
    #[serde(rename = "Instructions")]
    pub instructions: Value,
    #[serde(rename = "SolutionFound")]
    pub solution_found: Value,
    #[serde(rename = "Solution")]
    pub solution: Value,
    #[serde(rename = "Mods")]
    pub mods: Value,
    #[serde(rename = "Locked")]
    pub locked: Value,
    #[serde(rename = "Video")]
    pub video: Value,
    #[serde(rename = "Date")]
    pub date: Value,
    #[serde(rename = "PackId")]
    pub pack_id: Value,
    #[serde(rename = "FirstAchievedDate")]
    pub first_achieved_date: Value,
    #[serde(rename = "FirstAchievedBy")]
    pub first_achieved_by: Value,
    #[serde(rename = "ModeOrder")]
    pub mode_order: Value,
    #[serde(rename = "Ordering")]
    pub ordering: Value,
    #[serde(rename = "Rarity")]
    pub rarity: Value,
}

/// A row of the `medals` table.
#[derive(Clone, Debug, PartialEq, FromRow, Serialize)]
pub struct Medal {
    /// `None` if the upstream id was not numeric.
    pub medal_id: Option<i32>,
    pub name: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub restriction: Option<String>,
    pub category: Option<String>,
    pub instructions: Option<String>,
    pub solution_found: bool,
    pub solution: Option<String>,
    pub mods: Option<String>,
    pub locked: bool,
    pub video: Option<String>,
    #[serde(serialize_with = "serialize_datetime")]
    pub date: Option<PrimitiveDateTime>,
    pub pack_id: Option<String>,
    #[serde(serialize_with = "serialize_datetime")]
    pub first_achieved_date: Option<PrimitiveDateTime>,
    pub first_achieved_by: Option<String>,
    pub mode_order: Option<i32>,
    pub ordering: Option<i32>,
    pub rarity: Option<f64>,
}

impl Medal {
    /// Coerces the raw record; dates are stored as wall time at `local`.
    pub fn from_raw(raw: &RawMedal, local: UtcOffset) -> Self {
        Self {
            medal_id: coerce::int(&raw.medal_id),
            name: coerce::text(&raw.name),
            link: coerce::text(&raw.link),
            description: coerce::text(&raw.description),
            restriction: coerce::text(&raw.restriction),
            category: coerce::text(&raw.grouping),
            instructions: coerce::text(&raw.instructions),
            solution_found: coerce::truthy(&raw.solution_found),
            solution: coerce::text(&raw.solution),
            mods: coerce::text(&raw.mods),
            locked: coerce::truthy(&raw.locked),
            video: coerce::text(&raw.video),
            date: coerce::datetime(&raw.date, local),
            pack_id: coerce::text(&raw.pack_id),
            first_achieved_date: coerce::datetime(&raw.first_achieved_date, local),
            first_achieved_by: coerce::text(&raw.first_achieved_by),
            mode_order: coerce::int(&raw.mode_order),
            ordering: coerce::int(&raw.ordering),
            rarity: coerce::float(&raw.rarity),
        }
    }
}

static DATETIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

fn serialize_datetime<S: Serializer>(
    datetime: &Option<PrimitiveDateTime>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match datetime {
        Some(datetime) => {
            let formatted = datetime
                .format(DATETIME_FORMAT)
                .map_err(serde::ser::Error::custom)?;

            s.serialize_str(&formatted)
        }
        None => s.serialize_none(),
    }
}

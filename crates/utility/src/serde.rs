/// Serde helpers for the clock and date formats used by transit feed tables.
pub mod clock_time {
    use chrono::Duration;
    use serde::de::{Error as DeError, IntoDeserializer};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Parses a feed clock string into an offset from the start of the
    /// service day. Hours may exceed 24 to denote the next civil day, so the
    /// result is a `Duration` rather than a time of day.
    pub fn parse(s: &str) -> Result<Duration, String> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(format!("expected HH:MM:SS, got \"{}\"", s));
        }

        let hours: i64 = parts[0].parse().map_err(|_| format!("bad hours in \"{}\"", s))?;
        let minutes: i64 = parts[1]
            .parse()
            .map_err(|_| format!("bad minutes in \"{}\"", s))?;
        let seconds: i64 = parts[2]
            .parse()
            .map_err(|_| format!("bad seconds in \"{}\"", s))?;
        if !(0..100).contains(&hours)
            || !(0..60).contains(&minutes)
            || !(0..60).contains(&seconds)
        {
            return Err(format!("out-of-range clock time \"{}\"", s));
        }

        Ok(Duration::hours(hours)
            + Duration::minutes(minutes)
            + Duration::seconds(seconds))
    }

    pub fn format(duration: &Duration) -> String {
        let total_seconds = duration.num_seconds();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(D::Error::custom)
    }

    pub fn serialize_option<S>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => serialize(duration, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        match s.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => {
                let duration = deserialize(s.into_deserializer())?;
                Ok(Some(duration))
            }
        }
    }
}

pub mod date {
    use core::fmt;

    use chrono::NaiveDate;
    use serde::de::{self, Unexpected, Visitor};
    use serde::Deserializer;

    pub fn deserialize_yyyymmdd<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DateVisitor;

        impl<'de> Visitor<'de> for DateVisitor {
            type Value = NaiveDate;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string in the format YYYYMMDD")
            }

            fn visit_str<E>(self, value: &str) -> Result<NaiveDate, E>
            where
                E: de::Error,
            {
                NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|_| {
                    de::Error::invalid_value(Unexpected::Str(value), &self)
                })
            }
        }

        deserializer.deserialize_str(DateVisitor)
    }
}

/// Deserializes a missing or empty CSV field into the type's default.
pub fn default_if_empty<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de> + Default,
{
    use serde::Deserialize;
    Option::<T>::deserialize(de).map(|x| x.unwrap_or_default())
}

/// Deserializes an optional CSV field, mapping the empty string to `None`.
pub fn deserialize_non_empty<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    let value = Option::<String>::deserialize(de)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use serde::Deserialize;

    use super::clock_time;

    #[test]
    fn parse_and_format_clock_times() {
        assert_eq!(
            clock_time::parse("05:30:00").unwrap(),
            Duration::hours(5) + Duration::minutes(30)
        );
        assert_eq!(clock_time::format(&clock_time::parse("23:59:59").unwrap()), "23:59:59");
        // hours past midnight roll into the next civil day
        assert_eq!(
            clock_time::parse("25:10:00").unwrap(),
            Duration::hours(25) + Duration::minutes(10)
        );
        assert_eq!(clock_time::format(&clock_time::parse("25:10:00").unwrap()), "25:10:00");
    }

    #[test]
    fn rejects_malformed_clock_times() {
        assert!(clock_time::parse("").is_err());
        assert!(clock_time::parse("12:00").is_err());
        assert!(clock_time::parse("12:61:00").is_err());
        assert!(clock_time::parse("aa:bb:cc").is_err());
    }

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "super::date::deserialize_yyyymmdd")]
        date: NaiveDate,
        #[serde(deserialize_with = "super::deserialize_non_empty")]
        track: Option<String>,
    }

    #[test]
    fn csv_row_helpers() {
        let mut reader = csv::Reader::from_reader("date,track\n20240705,\n".as_bytes());
        let row: Row = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2024, 7, 5).unwrap());
        assert_eq!(row.track, None);
    }
}

//! Sensor publication: one entity per registration whose state is the
//! progress percentage and whose attributes carry the rest of the result.

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::age::{compact_age, compact_countdown};
use crate::calculator::evaluate;
use crate::registration::Registration;

pub const ATTR_AGE_EXACT: &str = "age_exact";
pub const ATTR_NEXT_BIRTHDAY: &str = "next_birthday";
pub const ATTR_TIME_UNTIL_NEXT: &str = "time_until_next";
pub const ATTR_PROGRESS_PERCENTAGE: &str = "progress_percentage";
pub const ATTR_NAME: &str = "name";
pub const ATTR_BIRTH_DATE: &str = "birth_date";
pub const ATTR_BIRTH_TIME: &str = "birth_time";
pub const ATTR_BIRTH_DATETIME: &str = "birth_datetime";
pub const ATTR_NEXT_BIRTHDAY_DATETIME: &str = "next_birthday_datetime";
pub const ATTR_AGE_COMPACT: &str = "age_compact";
pub const ATTR_TIME_UNTIL_COMPACT: &str = "time_until_compact";
pub const ATTR_TIME_SINCE_BIRTH: &str = "time_since_birth";
pub const ATTR_TIME_UNTIL_NEXT_DETAILED: &str = "time_until_next_detailed";

pub const ICON: &str = "mdi:cake-variant";
pub const UNIT: &str = "%";

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub entity_id: String,
    pub unique_id: String,
    pub friendly_name: String,
    pub icon: &'static str,
    pub unit_of_measurement: &'static str,
    /// `None` while the sensor is unavailable.
    pub state: Option<f64>,
    pub attributes: Map<String, Value>,
}

impl SensorState {
    pub fn is_available(&self) -> bool {
        self.state.is_some()
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn attribute_f64(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(Value::as_f64)
    }
}

pub fn entity_id_for(registration_id: &str) -> String {
    format!("sensor.{registration_id}_birthday_progress")
}

/// Evaluates `registration` at `now`. A failed evaluation yields an
/// unavailable state carrying only the identity attributes.
pub fn publish(registration: &Registration, now: NaiveDateTime) -> SensorState {
    let birth = &registration.birth;

    let mut attributes = Map::new();
    attributes.insert(ATTR_NAME.into(), json!(registration.name));
    attributes.insert(ATTR_BIRTH_DATE.into(), json!(birth.date().to_string()));
    attributes.insert(
        ATTR_BIRTH_TIME.into(),
        json!(birth.time().map(|t| t.to_string())),
    );

    let state = match evaluate(birth, now) {
        Ok(result) => {
            let next = result.next_anniversary;
            attributes.insert(ATTR_AGE_EXACT.into(), json!(result.age.to_string()));
            attributes.insert(ATTR_NEXT_BIRTHDAY.into(), json!(next.format(ISO_FORMAT).to_string()));
            attributes.insert(
                ATTR_TIME_UNTIL_NEXT.into(),
                json!(result.time_until.to_string()),
            );
            attributes.insert(
                ATTR_PROGRESS_PERCENTAGE.into(),
                json!(result.progress_percentage),
            );
            attributes.insert(
                ATTR_BIRTH_DATETIME.into(),
                json!(birth.at().format(DISPLAY_FORMAT).to_string()),
            );
            attributes.insert(
                ATTR_NEXT_BIRTHDAY_DATETIME.into(),
                json!(next.format(DISPLAY_FORMAT).to_string()),
            );
            attributes.insert(ATTR_TIME_SINCE_BIRTH.into(), json!(result.age.to_string()));
            attributes.insert(
                ATTR_TIME_UNTIL_NEXT_DETAILED.into(),
                json!(result.time_until.to_string()),
            );
            attributes.insert(
                ATTR_AGE_COMPACT.into(),
                json!(compact_age(result.completed_years(birth), result.since_previous())),
            );
            attributes.insert(
                ATTR_TIME_UNTIL_COMPACT.into(),
                json!(compact_countdown(result.until_next())),
            );
            Some(result.progress_percentage)
        }
        Err(e) => {
            tracing::debug!("{} is unavailable: {}", registration.name, e);
            None
        }
    };

    SensorState {
        entity_id: entity_id_for(&registration.id),
        unique_id: format!("{}_birthday_progress", registration.id),
        friendly_name: format!("{} Birthday Progress", registration.name),
        icon: ICON,
        unit_of_measurement: UNIT,
        state,
        attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::BirthInstant;
    use chrono::{NaiveDate, NaiveTime};

    fn registration(time: Option<NaiveTime>) -> Registration {
        Registration {
            id: "anna".into(),
            name: "Anna".into(),
            birth: BirthInstant::new(NaiveDate::from_ymd_opt(2017, 8, 23).unwrap(), time),
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 27)
            .unwrap()
            .and_hms_opt(20, 1, 8)
            .unwrap()
    }

    #[test]
    fn publishes_named_attributes() {
        let reg = registration(NaiveTime::from_hms_opt(20, 27, 0));
        let sensor = publish(&reg, now());

        assert_eq!(sensor.entity_id, "sensor.anna_birthday_progress");
        assert_eq!(sensor.unique_id, "anna_birthday_progress");
        assert_eq!(sensor.friendly_name, "Anna Birthday Progress");
        assert!(sensor.is_available());
        assert_eq!(sensor.state, sensor.attribute_f64(ATTR_PROGRESS_PERCENTAGE));
        assert_eq!(
            sensor.attribute_str(ATTR_AGE_EXACT),
            Some("8 years, 2 months, 3 days, 23 hours, 34 minutes, and 8 seconds")
        );
        assert_eq!(
            sensor.attribute_str(ATTR_TIME_UNTIL_NEXT),
            Some("9 months, 3 weeks, 6 days, 25 minutes, and 52 seconds")
        );
        assert_eq!(
            sensor.attribute_str(ATTR_TIME_SINCE_BIRTH),
            sensor.attribute_str(ATTR_AGE_EXACT)
        );
        assert_eq!(
            sensor.attribute_str(ATTR_TIME_UNTIL_NEXT_DETAILED),
            Some("9 months, 3 weeks, 6 days, 25 minutes, and 52 seconds")
        );
        assert_eq!(sensor.attribute_str(ATTR_NEXT_BIRTHDAY), Some("2026-08-23T20:27:00"));
        assert_eq!(
            sensor.attribute_str(ATTR_NEXT_BIRTHDAY_DATETIME),
            Some("23/08/2026 20:27:00")
        );
        assert_eq!(sensor.attribute_str(ATTR_BIRTH_DATETIME), Some("23/08/2017 20:27:00"));
        assert_eq!(sensor.attribute_str(ATTR_BIRTH_TIME), Some("20:27:00"));
        assert_eq!(sensor.attribute_str(ATTR_AGE_COMPACT), Some("8y 64d 23:34:08"));
        assert_eq!(
            sensor.attribute_str(ATTR_TIME_UNTIL_COMPACT),
            Some("300 days, 00:25:52")
        );
    }

    #[test]
    fn absent_birth_time_is_null() {
        let sensor = publish(&registration(None), now());
        assert_eq!(sensor.attributes.get(ATTR_BIRTH_TIME), Some(&Value::Null));
        assert_eq!(sensor.attribute_str(ATTR_BIRTH_DATETIME), Some("23/08/2017 00:00:00"));
    }

    #[test]
    fn evaluation_before_birth_is_unavailable() {
        let reg = registration(None);
        let before = NaiveDate::from_ymd_opt(2017, 8, 22)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let sensor = publish(&reg, before);

        assert!(!sensor.is_available());
        assert_eq!(sensor.attribute_str(ATTR_NAME), Some("Anna"));
        assert!(sensor.attributes.get(ATTR_AGE_EXACT).is_none());
        assert!(sensor.attributes.get(ATTR_PROGRESS_PERCENTAGE).is_none());
        assert!(sensor.attributes.get(ATTR_TIME_SINCE_BIRTH).is_none());
        assert!(sensor.attributes.get(ATTR_TIME_UNTIL_NEXT_DETAILED).is_none());
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{Datelike, Local, NaiveDate};
use model::TransitSystem;

use crate::data_model::{CalendarDateRow, CalendarRow, ExceptionType};

struct ServicePattern {
    service_key: String,
    weekdays: [bool; 7],
    start_date: NaiveDate,
    end_date: NaiveDate,
}

enum Exception {
    Add(String),
    Remove(String),
}

/// Active-service computation over the weekly patterns and per-date
/// exceptions of all three operators.
///
/// Service keys are unique keys (`SYSTEM-serviceId`), so a raw service-id
/// collision between operators cannot activate a foreign trip. The result is
/// cached per civil date; the cache lives inside the index, so a bundle swap
/// discards it together with the records it was computed from. Two
/// concurrent first calls for the same date may both compute the set, but
/// they compute the same value, so the second insert is harmless.
pub struct ServiceCalendar {
    patterns: Vec<ServicePattern>,
    exceptions: HashMap<NaiveDate, Vec<Exception>>,
    cache: Mutex<HashMap<NaiveDate, Arc<HashSet<String>>>>,
}

impl ServiceCalendar {
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
            exceptions: HashMap::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_rows(
        &mut self,
        system: TransitSystem,
        rows: &[CalendarRow],
        exceptions: &[CalendarDateRow],
    ) {
        for row in rows {
            self.patterns.push(ServicePattern {
                service_key: system.compose(&row.service_id),
                weekdays: row.weekdays(),
                start_date: row.start_date,
                end_date: row.end_date,
            });
        }
        for row in exceptions {
            let service_key = system.compose(&row.service_id);
            let exception = match row.exception_type {
                ExceptionType::ServiceAdded => Exception::Add(service_key),
                ExceptionType::ServiceRemoved => Exception::Remove(service_key),
            };
            self.exceptions.entry(row.date).or_default().push(exception);
        }
    }

    /// Set of service keys active on the given civil date.
    pub fn active_services_on(&self, date: NaiveDate) -> Arc<HashSet<String>> {
        if let Some(hit) = self.lock_cache().get(&date) {
            return Arc::clone(hit);
        }

        // computed outside the lock; a racing computation yields the same set
        let computed = Arc::new(self.compute(date));
        self.lock_cache()
            .entry(date)
            .or_insert(computed)
            .clone()
    }

    pub fn active_services_today(&self) -> Arc<HashSet<String>> {
        self.active_services_on(Local::now().date_naive())
    }

    fn compute(&self, date: NaiveDate) -> HashSet<String> {
        let weekday = date.weekday().num_days_from_monday() as usize;

        let mut active: HashSet<String> = self
            .patterns
            .iter()
            .filter(|pattern| {
                pattern.weekdays[weekday]
                    && pattern.start_date <= date
                    && date <= pattern.end_date
            })
            .map(|pattern| pattern.service_key.clone())
            .collect();

        if let Some(exceptions) = self.exceptions.get(&date) {
            for exception in exceptions {
                match exception {
                    Exception::Add(key) => {
                        active.insert(key.clone());
                    }
                    Exception::Remove(key) => {
                        active.remove(key);
                    }
                }
            }
        }

        active
    }

    fn lock_cache(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<NaiveDate, Arc<HashSet<String>>>> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for ServiceCalendar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use model::TransitSystem;

    use super::ServiceCalendar;
    use crate::data_model::calendar::ServiceAvailability;
    use crate::data_model::{CalendarDateRow, CalendarRow, ExceptionType};

    fn weekday_row(service_id: &str, saturday: bool) -> CalendarRow {
        let yes = ServiceAvailability::Available;
        let no = ServiceAvailability::Unavailable;
        CalendarRow {
            service_id: service_id.to_owned(),
            monday: yes,
            tuesday: yes,
            wednesday: yes,
            thursday: yes,
            friday: yes,
            saturday: if saturday { yes } else { no },
            sunday: no,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        }
    }

    #[test]
    fn weekday_and_date_range_filtering() {
        let mut calendar = ServiceCalendar::new();
        calendar.add_rows(
            TransitSystem::Lirr,
            &[weekday_row("WD", false), weekday_row("WE", true)],
            &[],
        );

        // 2024-07-01 is a Monday, 2024-07-06 a Saturday
        let monday = calendar
            .active_services_on(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert!(monday.contains("LIRR-WD"));
        assert!(monday.contains("LIRR-WE"));

        let saturday = calendar
            .active_services_on(NaiveDate::from_ymd_opt(2024, 7, 6).unwrap());
        assert!(!saturday.contains("LIRR-WD"));
        assert!(saturday.contains("LIRR-WE"));

        // outside the date range nothing runs
        let next_year = calendar
            .active_services_on(NaiveDate::from_ymd_opt(2025, 7, 7).unwrap());
        assert!(next_year.is_empty());
    }

    #[test]
    fn exceptions_add_and_remove() {
        let holiday = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap(); // a Thursday
        let mut calendar = ServiceCalendar::new();
        calendar.add_rows(
            TransitSystem::Mnr,
            &[weekday_row("WD", false)],
            &[
                CalendarDateRow {
                    service_id: "WD".to_owned(),
                    date: holiday,
                    exception_type: ExceptionType::ServiceRemoved,
                },
                CalendarDateRow {
                    service_id: "HOL".to_owned(),
                    date: holiday,
                    exception_type: ExceptionType::ServiceAdded,
                },
            ],
        );

        let active = calendar.active_services_on(holiday);
        assert!(!active.contains("MNR-WD"));
        assert!(active.contains("MNR-HOL"));
    }

    #[test]
    fn same_date_yields_identical_sets() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap();
        let mut calendar = ServiceCalendar::new();
        calendar.add_rows(TransitSystem::Subway, &[weekday_row("WD", false)], &[]);

        let first = calendar.active_services_on(date);
        let second = calendar.active_services_on(date);
        assert_eq!(first, second);
        // second call is served from the cache
        assert!(std::sync::Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn raw_service_ids_do_not_collide_across_systems() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap();
        let mut calendar = ServiceCalendar::new();
        calendar.add_rows(TransitSystem::Lirr, &[weekday_row("1", false)], &[]);

        let active = calendar.active_services_on(date);
        assert!(active.contains("LIRR-1"));
        assert!(!active.contains("MNR-1"));
    }
}

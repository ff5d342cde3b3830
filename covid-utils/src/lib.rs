//! Shared utility functions for the COVID trend crates.

/// Date utility functions
pub mod dates {
    use chrono::NaiveDate;

    /// Date format used for JHU time series column headers: "1/22/20"
    pub const JHU_HEADER_FORMAT: &str = "%m/%d/%y";

    /// Date format used for persisted tables and CLI arguments: "YYYY-MM-DD"
    pub const ISO_FORMAT: &str = "%Y-%m-%d";

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format(ISO_FORMAT).to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), ISO_FORMAT)?)
    }

    /// Try to read a table column header as a date.
    ///
    /// Accepts the JHU "M/D/YY" form and ISO dates. Anything else is a
    /// metadata column and yields `None`.
    pub fn parse_header_date(header: &str) -> Option<NaiveDate> {
        let header = header.trim();
        NaiveDate::parse_from_str(header, JHU_HEADER_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(header, ISO_FORMAT))
            .ok()
    }

    /// Parse a Socrata timestamp ("2021-03-04T00:00:00.000") down to its day.
    pub fn parse_socrata_date(s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        let day = s.split('T').next().unwrap_or(s);
        NaiveDate::parse_from_str(day, ISO_FORMAT).ok()
    }

    /// Number of days from 2020-01-01 through `today`.
    pub fn days_of_pandemic(today: &NaiveDate) -> i64 {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .map_or(0, |start| (*today - start).num_days().max(0))
    }

}

/// Canonical region identifiers.
pub mod regions {
    /// US states and territories with their postal abbreviations.
    pub const US_STATE_ABBREVIATIONS: &[(&str, &str)] = &[
        ("Alabama", "AL"),
        ("Alaska", "AK"),
        ("American Samoa", "AS"),
        ("Arizona", "AZ"),
        ("Arkansas", "AR"),
        ("California", "CA"),
        ("Colorado", "CO"),
        ("Connecticut", "CT"),
        ("Delaware", "DE"),
        ("District of Columbia", "DC"),
        ("Florida", "FL"),
        ("Georgia", "GA"),
        ("Guam", "GU"),
        ("Hawaii", "HI"),
        ("Idaho", "ID"),
        ("Illinois", "IL"),
        ("Indiana", "IN"),
        ("Iowa", "IA"),
        ("Kansas", "KS"),
        ("Kentucky", "KY"),
        ("Louisiana", "LA"),
        ("Maine", "ME"),
        ("Maryland", "MD"),
        ("Massachusetts", "MA"),
        ("Michigan", "MI"),
        ("Minnesota", "MN"),
        ("Mississippi", "MS"),
        ("Missouri", "MO"),
        ("Montana", "MT"),
        ("Nebraska", "NE"),
        ("Nevada", "NV"),
        ("New Hampshire", "NH"),
        ("New Jersey", "NJ"),
        ("New Mexico", "NM"),
        ("New York", "NY"),
        ("North Carolina", "NC"),
        ("North Dakota", "ND"),
        ("Northern Mariana Islands", "MP"),
        ("Ohio", "OH"),
        ("Oklahoma", "OK"),
        ("Oregon", "OR"),
        ("Pennsylvania", "PA"),
        ("Puerto Rico", "PR"),
        ("Rhode Island", "RI"),
        ("South Carolina", "SC"),
        ("South Dakota", "SD"),
        ("Tennessee", "TN"),
        ("Texas", "TX"),
        ("Utah", "UT"),
        ("Vermont", "VT"),
        ("Virgin Islands", "VI"),
        ("Virginia", "VA"),
        ("Washington", "WA"),
        ("West Virginia", "WV"),
        ("Wisconsin", "WI"),
        ("Wyoming", "WY"),
    ];

    /// Postal abbreviation for a state name ("Texas" -> "TX").
    pub fn state_abbreviation(name: &str) -> Option<&'static str> {
        let name = name.trim();
        US_STATE_ABBREVIATIONS
            .iter()
            .find(|(state, _)| *state == name)
            .map(|(_, abbrev)| *abbrev)
    }

    /// State name for a postal abbreviation ("tx" -> "Texas").
    pub fn state_name(abbreviation: &str) -> Option<&'static str> {
        let abbreviation = abbreviation.trim();
        US_STATE_ABBREVIATIONS
            .iter()
            .find(|(_, abbrev)| abbrev.eq_ignore_ascii_case(abbreviation))
            .map(|(state, _)| *state)
    }

    /// Composite county key: "Autauga, Alabama".
    pub fn county_key(county: &str, state: &str) -> String {
        format!("{}, {}", county.trim(), state.trim())
    }

    /// Split a county key back into (county, state).
    pub fn split_county_key(key: &str) -> Option<(&str, &str)> {
        let (county, state) = key.rsplit_once(", ")?;
        if county.is_empty() || state.is_empty() {
            return None;
        }
        Some((county, state))
    }

}

/// Named groups of JHU country names.
pub mod groups {
    pub const G7_COUNTRIES: &[&str] = &[
        "Japan",
        "Canada",
        "Germany",
        "Italy",
        "France",
        "United Kingdom",
        "US",
    ];

    pub const EUROPEAN_UNION: &[&str] = &[
        "Austria",
        "Belgium",
        "Bulgaria",
        "Croatia",
        "Cyprus",
        "Czechia",
        "Denmark",
        "Estonia",
        "Finland",
        "France",
        "Germany",
        "Greece",
        "Hungary",
        "Ireland",
        "Italy",
        "Latvia",
        "Lithuania",
        "Luxembourg",
        "Malta",
        "Netherlands",
        "Poland",
        "Portugal",
        "Romania",
        "Slovakia",
        "Slovenia",
        "Spain",
        "Sweden",
    ];

    pub const G20_COUNTRIES: &[&str] = &[
        "Argentina",
        "Australia",
        "Brazil",
        "Canada",
        "China",
        "France",
        "Germany",
        "India",
        "Indonesia",
        "Italy",
        "Japan",
        "Korea, South",
        "Mexico",
        "Russia",
        "Saudi Arabia",
        "South Africa",
        "Turkey",
        "United Kingdom",
        "US",
    ];

    /// Look up a group by name ("g7", "g20", "eu").
    pub fn by_name(name: &str) -> Option<&'static [&'static str]> {
        match name.trim().to_lowercase().as_str() {
            "g7" => Some(G7_COUNTRIES),
            "g20" => Some(G20_COUNTRIES),
            "eu" | "european-union" => Some(EUROPEAN_UNION),
            _ => None,
        }
    }

}

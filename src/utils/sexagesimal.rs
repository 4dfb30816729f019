use once_cell::sync::OnceCell;
use regex::Regex;

pub fn value_to_sexagesimal(value: f64, zero: bool, frac: u8) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let value = value.abs();
    let mut hours = value.trunc() as i32;
    let round = match frac {
        9 => 0.5,
        8 => 5.0,
        6 => 50.0,
        5 => 50.0 * 60.0 / 10.0,
        3 => 50.0 * 60.0,
        _ => 0.0,
    };
    let mut seconds100 = (value.fract() * 3600.0 * 100.0 + round) as u32;
    if seconds100 >= 3600 * 100 {
        hours += if hours < 0 { -1 } else { 1 };
        seconds100 -= 3600 * 100;
    }
    let minutes100 = seconds100 / 60;
    seconds100 %= 60 * 100;
    match (frac, zero) {
        (3, false) => format!("{}{}:{:02}", sign, hours, minutes100 / 100),
        (3, true)  => format!("{}{:02}:{:02}", sign, hours, minutes100 / 100),
        (5, false) => format!("{}{}:{:02}.{}", sign, hours, minutes100 / 100, (minutes100 % 100)/10),
        (5, true)  => format!("{}{:02}:{:02}.{}", sign, hours, minutes100 / 100, (minutes100 % 100)/10),
        (6, false) => format!("{}{}:{:02}:{:02}", sign, hours, minutes100 / 100, seconds100 / 100),
        (6, true)  => format!("{}{:02}:{:02}:{:02}", sign, hours, minutes100 / 100, seconds100 / 100),
        (8, false) => format!("{}{}:{:02}:{:02}.{}", sign, hours, minutes100 / 100, seconds100 / 100, (seconds100 % 100) / 10),
        (8, true)  => format!("{}{:02}:{:02}:{:02}.{}", sign, hours, minutes100 / 100, seconds100 / 100, (seconds100 % 100) / 10),
        (9, false) => format!("{}{}:{:02}:{:02}.{:02}", sign, hours, minutes100 / 100, seconds100 / 100, seconds100 % 100),
        (9, true)  => format!("{}{:02}:{:02}:{:02}.{:02}", sign, hours, minutes100 / 100, seconds100 / 100, seconds100 % 100),
        _          => value.to_string(),
    }
}

/// Parses `HH:MM`, `HH:MM.M`, `HH:MM:SS` and `HH:MM:SS.S[S]`, with an
/// optional sign
pub fn sexagesimal_to_value(text: &str) -> Option<f64> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^([+-]?)(\d+):(\d+(?:\.\d+)?)(?::(\d+(?:\.\d+)?))?$").unwrap()
    });

    let captures = re.captures(text.trim())?;
    let is_neg = &captures[1] == "-";
    let hours = captures[2].parse::<f64>().ok()?;
    let minutes = captures[3].parse::<f64>().ok()?;
    let seconds = match captures.get(4) {
        Some(m) => m.as_str().parse::<f64>().ok()?,
        None => 0.0,
    };

    let value = hours + minutes / 60.0 + seconds / 3600.0;
    Some(if !is_neg { value } else { -value })
}

#[test]
fn test_sexagesimal_to_value() {
    assert!(sexagesimal_to_value("").is_none());
    assert!(sexagesimal_to_value("junk").is_none());
    assert!(sexagesimal_to_value("1:00").unwrap() == 1.0);
    assert!(sexagesimal_to_value("-1:00").unwrap() == -1.0);
    assert!(sexagesimal_to_value("10:30").unwrap() == 10.5);
    assert!(sexagesimal_to_value("-10:30").unwrap() == -10.5);
    assert!(sexagesimal_to_value("10:30.3").unwrap() == 10.505);
    assert!(sexagesimal_to_value("-10:30.3").unwrap() == -10.505);
    assert!(sexagesimal_to_value("10:30:00").unwrap() == 10.5);
    assert!(sexagesimal_to_value("10:30:30").unwrap() == 10.508333333333333);
    assert!(sexagesimal_to_value(" +2:15:00 ").unwrap() == 2.25);
}

#[test]
fn test_value_to_sexagesimal() {
    assert_eq!(value_to_sexagesimal(10.5, false, 6), "10:30:00");
    assert_eq!(value_to_sexagesimal(10.5, true, 6), "10:30:00");
    assert_eq!(value_to_sexagesimal(-0.5, true, 6), "-00:30:00");
    assert_eq!(value_to_sexagesimal(2.25, false, 3), "2:15");
}

#[test]
fn test_sexagesimal_round_trip() {
    for value in [0.0, 1.25, 10.508333333333333, -45.5] {
        let text = value_to_sexagesimal(value, true, 8);
        let parsed = sexagesimal_to_value(&text).unwrap();
        assert!(f64::abs(parsed - value) < 1.0 / 36000.0, "{} -> {}", value, text);
    }
}

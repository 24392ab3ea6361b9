use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

// 数值工具

/// 只保留有限值，NaN / ±inf 视为缺失
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// 四舍五入到两位小数，`-0.00` 归一为 `0.00`
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn format_price(value: f64) -> String {
    format!("{:.2}", round2(value))
}

/// 带符号的两位小数，例如 `+0.03` / `-1.10`
pub fn format_signed(value: f64) -> String {
    format!("{:+.2}", round2(value))
}

pub fn format_percent(value: f64) -> String {
    format!("{:+.2}%", round2(value))
}

pub fn format_volume(volume: u64) -> String {
    let digits = volume.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// 时间工具

/// ISO-8601 UTC, second precision, `Z` suffix
pub fn iso_utc(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// RSS 使用的 RFC 2822 时间
pub fn rfc2822_utc(ts: &DateTime<Utc>) -> String {
    ts.to_rfc2822()
}

/// 条目 id 中的时间片段，例如 `20261019-1430`
pub fn entry_stamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y%m%d-%H%M").to_string()
}

/// Unix 秒转 UTC 时间，超出范围返回 None
pub fn from_unix_seconds(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_normalizes_negative_zero() {
        assert_eq!(format_signed(-0.001), "+0.00");
        assert_eq!(format_signed(1.23 - 1.20), "+0.03");
        assert_eq!(format_signed(-0.456), "-0.46");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(2.5), "+2.50%");
        assert_eq!(format_percent(-12.346), "-12.35%");
    }

    #[test]
    fn test_format_volume() {
        assert_eq!(format_volume(0), "0");
        assert_eq!(format_volume(999), "999");
        assert_eq!(format_volume(500000), "500,000");
        assert_eq!(format_volume(1234567), "1,234,567");
    }

    #[test]
    fn test_time_formats() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 5).unwrap();
        assert_eq!(iso_utc(&ts), "2026-10-19T14:30:05Z");
        assert_eq!(entry_stamp(&ts), "20261019-1430");
        assert_eq!(rfc2822_utc(&ts), "Mon, 19 Oct 2026 14:30:05 +0000");
    }

    #[test]
    fn test_finite() {
        assert_eq!(finite(Some(1.5)), Some(1.5));
        assert_eq!(finite(Some(f64::NAN)), None);
        assert_eq!(finite(None), None);
    }
}

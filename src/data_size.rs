use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A size in bytes, constructible from SI (`kilobytes`, powers of 1000) or IEC (`kibibytes`,
/// powers of 1024) units.
///
/// Every limit in [`SizeLimit`](crate::SizeLimit) accepts a `DataSize` or a plain `u64` byte count.
///
/// # Examples
///
/// ```
/// use multispool::DataSize;
///
/// assert_eq!(DataSize::kibibytes(8).as_u64(), 8192);
/// assert_eq!("5 MiB".parse::<DataSize>().unwrap(), DataSize::mebibytes(5));
/// assert_eq!("128KB".parse::<DataSize>().unwrap().as_u64(), 128_000);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataSize(u64);

const KILO: u64 = 1000;
const KIBI: u64 = 1024;

impl DataSize {
    pub const fn bytes(count: u64) -> DataSize {
        DataSize(count)
    }

    pub const fn kilobytes(count: u64) -> DataSize {
        DataSize(count.saturating_mul(KILO))
    }

    pub const fn megabytes(count: u64) -> DataSize {
        DataSize(count.saturating_mul(KILO * KILO))
    }

    pub const fn gigabytes(count: u64) -> DataSize {
        DataSize(count.saturating_mul(KILO * KILO * KILO))
    }

    pub const fn terabytes(count: u64) -> DataSize {
        DataSize(count.saturating_mul(KILO * KILO * KILO * KILO))
    }

    pub const fn kibibytes(count: u64) -> DataSize {
        DataSize(count.saturating_mul(KIBI))
    }

    pub const fn mebibytes(count: u64) -> DataSize {
        DataSize(count.saturating_mul(KIBI * KIBI))
    }

    pub const fn gibibytes(count: u64) -> DataSize {
        DataSize(count.saturating_mul(KIBI * KIBI * KIBI))
    }

    pub const fn tebibytes(count: u64) -> DataSize {
        DataSize(count.saturating_mul(KIBI * KIBI * KIBI * KIBI))
    }

    /// The size in bytes.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    fn multiplier_for(unit: &str) -> Option<u64> {
        let multiplier = match unit.to_ascii_lowercase().as_str() {
            "" | "b" | "byte" | "bytes" => 1,
            "k" | "kb" | "kilobyte" | "kilobytes" => KILO,
            "kib" | "kibibyte" | "kibibytes" => KIBI,
            "m" | "mb" | "megabyte" | "megabytes" => KILO.pow(2),
            "mib" | "mebibyte" | "mebibytes" => KIBI.pow(2),
            "g" | "gb" | "gigabyte" | "gigabytes" => KILO.pow(3),
            "gib" | "gibibyte" | "gibibytes" => KIBI.pow(3),
            "t" | "tb" | "terabyte" | "terabytes" => KILO.pow(4),
            "tib" | "tebibyte" | "tebibytes" => KIBI.pow(4),
            _ => return None,
        };

        Some(multiplier)
    }
}

impl From<u64> for DataSize {
    fn from(bytes: u64) -> Self {
        DataSize(bytes)
    }
}

impl From<DataSize> for u64 {
    fn from(size: DataSize) -> Self {
        size.0
    }
}

impl FromStr for DataSize {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || crate::Error::InvalidDataSize(s.to_owned());

        let trimmed = s.trim();
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());

        let count = trimmed[..digits_end].parse::<u64>().map_err(|_| invalid())?;
        let multiplier = DataSize::multiplier_for(trimmed[digits_end..].trim_start()).ok_or_else(invalid)?;

        count.checked_mul(multiplier).map(DataSize).ok_or_else(invalid)
    }
}

impl Display for DataSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0 == 1 {
            write!(f, "1 byte")
        } else {
            write!(f, "{} bytes", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(DataSize::bytes(42).as_u64(), 42);
        assert_eq!(DataSize::kilobytes(1).as_u64(), 1000);
        assert_eq!(DataSize::kibibytes(1).as_u64(), 1024);
        assert_eq!(DataSize::megabytes(200).as_u64(), 200_000_000);
        assert_eq!(DataSize::mebibytes(100).as_u64(), 100 * 1024 * 1024);
        assert_eq!(DataSize::gibibytes(1).as_u64(), 1 << 30);
        assert_eq!(DataSize::tebibytes(u64::MAX).as_u64(), u64::MAX);
    }

    #[test]
    fn test_parse() {
        assert_eq!("42".parse::<DataSize>(), Ok(DataSize::bytes(42)));
        assert_eq!("42 bytes".parse::<DataSize>(), Ok(DataSize::bytes(42)));
        assert_eq!("128KB".parse::<DataSize>(), Ok(DataSize::kilobytes(128)));
        assert_eq!("8 KiB".parse::<DataSize>(), Ok(DataSize::kibibytes(8)));
        assert_eq!("5 mebibytes".parse::<DataSize>(), Ok(DataSize::mebibytes(5)));
        assert_eq!(" 1g ".parse::<DataSize>(), Ok(DataSize::gigabytes(1)));
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<DataSize>().is_err());
        assert!("KB".parse::<DataSize>().is_err());
        assert!("12 parsecs".parse::<DataSize>().is_err());
        assert!("-1".parse::<DataSize>().is_err());
        assert!("99999999999 TiB".parse::<DataSize>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(DataSize::bytes(1).to_string(), "1 byte");
        assert_eq!(DataSize::kibibytes(1).to_string(), "1024 bytes");
    }
}

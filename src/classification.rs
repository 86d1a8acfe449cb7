//! Fixed option sets offered by the report form.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}; expected one of: {allowed}")]
pub struct UnknownOption {
    pub kind: &'static str,
    pub value: String,
    pub allowed: String,
}

/// Severity of a drain blockage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloggingLevel {
    /// 양호
    Good,
    /// 주의
    Caution,
    /// 막힘
    Blocked,
    /// 폐색
    Sealed,
}

impl CloggingLevel {
    pub const ALL: [CloggingLevel; 4] = [
        CloggingLevel::Good,
        CloggingLevel::Caution,
        CloggingLevel::Blocked,
        CloggingLevel::Sealed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CloggingLevel::Good => "양호",
            CloggingLevel::Caution => "주의",
            CloggingLevel::Blocked => "막힘",
            CloggingLevel::Sealed => "폐색",
        }
    }
}

impl FromStr for CloggingLevel {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownOption {
                kind: "cloggingLevel",
                value: s.to_string(),
                allowed: joined(Self::ALL.iter().map(|l| l.as_str())),
            })
    }
}

impl fmt::Display for CloggingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is blocking the drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CauseType {
    NotBlocked,
    Litter,
    CigaretteButts,
    FallenLeaves,
    Cement,
    Branches,
    Waste,
    Sediment,
    /// 기타; needs a free-text detail
    Other,
}

impl CauseType {
    pub const ALL: [CauseType; 9] = [
        CauseType::NotBlocked,
        CauseType::Litter,
        CauseType::CigaretteButts,
        CauseType::FallenLeaves,
        CauseType::Cement,
        CauseType::Branches,
        CauseType::Waste,
        CauseType::Sediment,
        CauseType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CauseType::NotBlocked => "안막힘",
            CauseType::Litter => "쓰레기",
            CauseType::CigaretteButts => "담배꽁초",
            CauseType::FallenLeaves => "낙엽",
            CauseType::Cement => "시멘트",
            CauseType::Branches => "나뭇가지",
            CauseType::Waste => "폐기물",
            CauseType::Sediment => "토사",
            CauseType::Other => "기타",
        }
    }

    pub fn requires_detail(&self) -> bool {
        matches!(self, CauseType::Other)
    }
}

impl FromStr for CauseType {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|cause| cause.as_str() == s)
            .ok_or_else(|| UnknownOption {
                kind: "causeType",
                value: s.to_string(),
                allowed: joined(Self::ALL.iter().map(|c| c.as_str())),
            })
    }
}

impl fmt::Display for CauseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn joined<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(", ")
}

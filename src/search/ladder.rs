//! The relaxation ladder.
//!
//! Supplier search tries a fixed sequence of constraint sets, most
//! constrained first, and stops at the first one that yields rows. Each step
//! drops exactly one dimension from the step before it. `buyer_country` is not
//! a [`Dimension`]: it is never relaxed and applies at every step.
//!
//! | # | Step | Active dimensions |
//! |---|------|-------------------|
//! | 1 | `exact` | keywords, `max_price`, `bidder_country`, `year_range` |
//! | 2 | `drop_keywords` | `max_price`, `bidder_country`, `year_range` |
//! | 3 | `drop_max_price` | `bidder_country`, `year_range` |
//! | 4 | `drop_bidder_country` | `year_range` |
//! | 5 | `unconstrained` | (none) |

use serde::Serialize;
use std::fmt;

/// A relaxable search dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Substring match on tender title or description.
    Keywords,
    /// Upper bound on the tender price.
    MaxPrice,
    /// Country of the bidding supplier.
    BidderCountry,
    /// Inclusive tender year bounds (`year_min` and/or `year_max`).
    YearRange,
}

impl Dimension {
    /// All dimensions, in relaxation order (first dropped first).
    pub const ALL: [Self; 4] = [
        Self::Keywords,
        Self::MaxPrice,
        Self::BidderCountry,
        Self::YearRange,
    ];

    /// Returns the dimension name as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Keywords => "keywords",
            Self::MaxPrice => "max_price",
            Self::BidderCountry => "bidder_country",
            Self::YearRange => "year_range",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Keywords => 1,
            Self::MaxPrice => 1 << 1,
            Self::BidderCountry => 1 << 2,
            Self::YearRange => 1 << 3,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of [`Dimension`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DimensionSet(u8);

impl DimensionSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Every dimension.
    pub const ALL: Self = Self::EMPTY
        .with(Dimension::Keywords)
        .with(Dimension::MaxPrice)
        .with(Dimension::BidderCountry)
        .with(Dimension::YearRange);

    /// Returns a copy of this set including `dimension`.
    #[must_use]
    pub const fn with(self, dimension: Dimension) -> Self {
        Self(self.0 | dimension.bit())
    }

    /// Returns a copy of this set without `dimension`.
    #[must_use]
    pub const fn without(self, dimension: Dimension) -> Self {
        Self(self.0 & !dimension.bit())
    }

    /// Returns true if `dimension` is in the set.
    #[must_use]
    pub const fn contains(self, dimension: Dimension) -> bool {
        self.0 & dimension.bit() != 0
    }

    /// Returns the intersection of two sets.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Number of dimensions in the set.
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if every member of `self` is in `other` and `other` has more.
    #[must_use]
    pub const fn is_strict_subset_of(self, other: Self) -> bool {
        self.0 & other.0 == self.0 && self.0 != other.0
    }

    /// Iterates members in relaxation order.
    pub fn iter(self) -> impl Iterator<Item = Dimension> {
        Dimension::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl FromIterator<Dimension> for DimensionSet {
    fn from_iter<I: IntoIterator<Item = Dimension>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl fmt::Display for DimensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|d| d.as_str()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// One rung of the relaxation ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelaxationStep {
    name: &'static str,
    ordinal: usize,
    active: DimensionSet,
}

impl RelaxationStep {
    const fn new(name: &'static str, ordinal: usize, active: DimensionSet) -> Self {
        Self {
            name,
            ordinal,
            active,
        }
    }

    /// Step name, used in errors and for disclosure to the user.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// 1-based position in the ladder.
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Dimensions applied at this step.
    #[must_use]
    pub const fn active(&self) -> DimensionSet {
        self.active
    }

    /// Returns true for the final, fully relaxed step.
    #[must_use]
    pub const fn is_unconstrained(&self) -> bool {
        self.active.is_empty()
    }

    /// The most constrained step.
    #[must_use]
    pub const fn first() -> Self {
        RELAXATION_LADDER[0]
    }

    /// The fully relaxed step.
    #[must_use]
    pub const fn last() -> Self {
        RELAXATION_LADDER[RELAXATION_LADDER.len() - 1]
    }

    /// Looks a step up by name.
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        RELAXATION_LADDER.iter().copied().find(|s| s.name == name)
    }
}

impl fmt::Display for RelaxationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.active)
    }
}

/// The canonical relaxation order, most constrained first.
pub const RELAXATION_LADDER: [RelaxationStep; 5] = [
    RelaxationStep::new("exact", 1, DimensionSet::ALL),
    RelaxationStep::new(
        "drop_keywords",
        2,
        DimensionSet::ALL.without(Dimension::Keywords),
    ),
    RelaxationStep::new(
        "drop_max_price",
        3,
        DimensionSet::EMPTY
            .with(Dimension::BidderCountry)
            .with(Dimension::YearRange),
    ),
    RelaxationStep::new(
        "drop_bidder_country",
        4,
        DimensionSet::EMPTY.with(Dimension::YearRange),
    ),
    RelaxationStep::new("unconstrained", 5, DimensionSet::EMPTY),
];

//! Market-quality aggregates per (player, team, market) group: how many
//! books post the prop and how much hold the best two-way prices carry.

use std::collections::{HashMap, HashSet};

use crate::types::{CanonicalKey, Market, OddsQuote, Side};

use super::odds::implied_probability;

/// Group identity. Position is deliberately not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarketGroupKey {
    pub player: String,
    pub team: String,
    pub market: Market,
}

impl MarketGroupKey {
    pub fn new(key: &CanonicalKey, market: Market) -> Self {
        Self {
            player: key.player.clone(),
            team: key.team.clone(),
            market,
        }
    }
}

/// Gating inputs for one market group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketQuality {
    /// Distinct bookmakers quoting the group.
    pub book_count: usize,
    /// Combined hold of the best over and best under, floored at 0.
    /// Infinite when a side has no valid price.
    pub vig: f64,
}

#[derive(Debug, Default)]
struct GroupAccumulator {
    books: HashSet<String>,
    best_over: Option<f64>,
    best_under: Option<f64>,
}

impl GroupAccumulator {
    fn add(&mut self, quote: &OddsQuote) {
        self.books.insert(quote.bookmaker.trim().to_string());
        let Some(implied) = implied_probability(quote.price) else {
            return;
        };
        let slot = match quote.side {
            Side::Over => &mut self.best_over,
            Side::Under => &mut self.best_under,
        };
        // Best price for the bettor is the lowest implied probability.
        *slot = Some(slot.map_or(implied, |current| current.min(implied)));
    }

    fn quality(&self) -> MarketQuality {
        let vig = match (self.best_over, self.best_under) {
            (Some(over), Some(under)) => (over + under - 1.0).max(0.0),
            _ => f64::INFINITY,
        };
        MarketQuality {
            book_count: self.books.len(),
            vig,
        }
    }
}

/// Book counts and hold for every market group in a quote set.
#[derive(Debug, Clone, Default)]
pub struct MarketBook {
    groups: HashMap<MarketGroupKey, MarketQuality>,
}

impl MarketBook {
    /// Aggregate keyed quotes. Quotes on unsupported markets are ignored.
    pub fn build<'a, I>(quotes: I) -> Self
    where
        I: IntoIterator<Item = (&'a CanonicalKey, &'a OddsQuote)>,
    {
        let mut acc: HashMap<MarketGroupKey, GroupAccumulator> = HashMap::new();
        for (key, quote) in quotes {
            let Some(market) = quote.market_kind() else {
                continue;
            };
            acc.entry(MarketGroupKey::new(key, market))
                .or_default()
                .add(quote);
        }
        let groups = acc
            .into_iter()
            .map(|(group, stats)| (group, stats.quality()))
            .collect();
        Self { groups }
    }

    /// Quality of the group a quote with this key and market belongs to.
    pub fn quality(&self, key: &CanonicalKey, market: Market) -> Option<MarketQuality> {
        self.groups.get(&MarketGroupKey::new(key, market)).copied()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

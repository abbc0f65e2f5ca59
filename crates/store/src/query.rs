use common::UserId;
use domain::{Money, Order, Product};

/// Builder for catalog searches.
///
/// A missing lower bound means 0, a missing upper bound means unbounded;
/// both bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Case-insensitive substring of the product name.
    pub keyword: Option<String>,

    /// Minimum price (inclusive).
    pub min_price: Option<Money>,

    /// Maximum price (inclusive).
    pub max_price: Option<Money>,
}

impl ProductQuery {
    /// Creates a query matching every product.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by name substring. Blank keywords are ignored.
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        self.keyword = if keyword.trim().is_empty() {
            None
        } else {
            Some(keyword)
        };
        self
    }

    /// Filters by minimum price.
    pub fn min_price(mut self, price: Money) -> Self {
        self.min_price = Some(price);
        self
    }

    /// Filters by maximum price.
    pub fn max_price(mut self, price: Money) -> Self {
        self.max_price = Some(price);
        self
    }

    /// Returns the effective lower price bound.
    pub fn lower_bound(&self) -> Money {
        self.min_price.unwrap_or_else(Money::zero)
    }

    /// Checks if a product matches this query.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(ref keyword) = self.keyword
            && !product.name_matches(keyword)
        {
            return false;
        }

        if product.price < self.lower_bound() {
            return false;
        }

        if let Some(max) = self.max_price
            && product.price > max
        {
            return false;
        }

        true
    }
}

/// Builder for order listings.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Filter by owning user.
    pub user_id: Option<UserId>,
}

impl OrderQuery {
    /// Creates a query matching every order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a query for one user's orders.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// Checks if an order matches this query.
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.is_none_or(|id| order.user_id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price_cents: i64) -> Product {
        let mut product = Product::sample(UserId::new());
        product.name = name.to_string();
        product.price = Money::from_cents(price_cents);
        product
    }

    #[test]
    fn empty_query_matches_everything() {
        let query = ProductQuery::new();
        assert!(query.matches(&product("Anything", 0)));
        assert!(query.matches(&product("Expensive", i64::MAX)));
    }

    #[test]
    fn keyword_is_case_insensitive_substring() {
        let query = ProductQuery::new().keyword("phone");
        assert!(query.matches(&product("iPhone Case", 1000)));
        assert!(query.matches(&product("HEADPHONES", 1000)));
        assert!(!query.matches(&product("Laptop", 1000)));
    }

    #[test]
    fn blank_keyword_is_ignored() {
        let query = ProductQuery::new().keyword("   ");
        assert!(query.keyword.is_none());
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let query = ProductQuery::new()
            .min_price(Money::from_cents(1000))
            .max_price(Money::from_cents(2000));

        assert!(!query.matches(&product("a", 999)));
        assert!(query.matches(&product("b", 1000)));
        assert!(query.matches(&product("c", 2000)));
        assert!(!query.matches(&product("d", 2001)));
    }
}

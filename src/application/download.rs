use crate::domain::order::Order;
use std::fmt;
use url::form_urlencoded;

/// Link a buyer uses to fetch the file they paid for.
///
/// Only constructed here; the endpoint that checks the token lives elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink(String);

impl DownloadLink {
    /// Builds the link for a completed order, `None` otherwise.
    ///
    /// Query values are form-encoded, so an order id cannot smuggle in extra
    /// parameters.
    pub fn for_order(origin: &str, order: &Order) -> Option<Self> {
        if !order.is_downloadable() {
            return None;
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("order_id", order.id.as_str())
            .append_pair("token", &order.access_token)
            .finish();
        Some(Self(format!(
            "{}/api/secure-download?{}",
            origin.trim_end_matches('/'),
            query
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DownloadLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Amount;
    use crate::domain::order::{OrderId, OrderStatus};
    use crate::domain::product::Product;
    use crate::domain::session::Session;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        let session = Session::new("buyer-1", "pioneer").unwrap();
        let product = Product::new("p-1", "seller-1", "Preset pack", Amount::new(dec!(5)).unwrap(), "PI");
        Order::new(OrderId::new("o-1"), &session, &product, None)
    }

    #[test]
    fn test_link_embeds_order_and_token() {
        let mut order = order();
        order.status = OrderStatus::Completed;

        let link = DownloadLink::for_order("https://shop.example/", &order).unwrap();

        assert_eq!(
            link.as_str(),
            format!(
                "https://shop.example/api/secure-download?order_id=o-1&token={}",
                order.access_token
            )
        );
    }

    #[test]
    fn test_no_link_before_completion() {
        assert!(DownloadLink::for_order("https://shop.example", &order()).is_none());
    }

    #[test]
    fn test_reserved_characters_in_order_id_are_encoded() {
        let session = Session::new("buyer-1", "pioneer").unwrap();
        let product = Product::new("p-1", "seller-1", "Preset pack", Amount::new(dec!(5)).unwrap(), "PI");
        let mut order = Order::new(OrderId::new("o 1&token=forged"), &session, &product, None);
        order.status = OrderStatus::Completed;

        let link = DownloadLink::for_order("https://shop.example", &order).unwrap();

        assert_eq!(
            link.as_str(),
            format!(
                "https://shop.example/api/secure-download?order_id=o+1%26token%3Dforged&token={}",
                order.access_token
            )
        );
        assert_eq!(link.as_str().matches("token=").count(), 1);
    }
}

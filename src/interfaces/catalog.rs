use crate::domain::product::Product;
use crate::error::Result;
use std::io::Read;

/// Reads a JSON array of products.
pub fn read_catalog<R: Read>(source: R) -> Result<Vec<Product>> {
    Ok(serde_json::from_reader(source)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckoutError;

    #[test]
    fn test_read_catalog() {
        let json = r#"[
            {"id": "p-1", "user_id": "seller-1", "title": "Preset pack", "price": "5", "currency": "PI",
             "tags": ["photo", "lightroom"], "download_expiry_hours": 24},
            {"id": "p-2", "user_id": "seller-1", "title": "E-book", "price": 2.5, "currency": "PI", "is_active": false}
        ]"#;
        let products = read_catalog(json.as_bytes()).unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].tags, vec!["photo", "lightroom"]);
        assert_eq!(products[0].download_expiry_hours, 24);
        assert!(!products[1].is_active);
    }

    #[test]
    fn test_read_catalog_invalid_json() {
        let result = read_catalog("{not json".as_bytes());
        assert!(matches!(result, Err(CheckoutError::JsonError(_))));
    }
}

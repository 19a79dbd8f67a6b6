//! Product catalog filtering for the portfolio grid.

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    New,
    Popular,
    Limited,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub category: String,
    pub description: String,
    pub image_url: String,
    #[serde(default)]
    pub details: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
}

/// Catalog filter state: an optional exact category plus a free-text search.
/// Both conditions must hold for a product to be listed.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: String,
}

impl CatalogQuery {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category {
            if product.category != *category {
                return false;
            }
        }
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        product.title.to_lowercase().contains(&needle)
            || product.description.to_lowercase().contains(&needle)
    }
}

/// Products matching the query, preserving catalog order.
pub fn filter_products<'a>(products: &'a [Product], query: &CatalogQuery) -> Vec<&'a Product> {
    products.iter().filter(|p| query.matches(p)).collect()
}

/// Distinct categories in first-seen order, each with its product count.
pub fn category_counts(products: &[Product]) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = Vec::new();
    for p in products {
        match out.iter_mut().find(|(c, _)| *c == p.category) {
            Some((_, n)) => *n += 1,
            None => out.push((p.category.clone(), 1)),
        }
    }
    out
}

/// The built-in demo catalog the site ships with.
pub fn demo_products() -> Vec<Product> {
    let product = |id: &str,
                   title: &str,
                   category: &str,
                   description: &str,
                   image_url: &str,
                   details: &[&str],
                   status: Option<ProductStatus>| Product {
        id: id.to_owned(),
        title: title.to_owned(),
        category: category.to_owned(),
        description: description.to_owned(),
        image_url: image_url.to_owned(),
        details: details.iter().map(|d| (*d).to_owned()).collect(),
        status,
    };
    vec![
        product(
            "TAC-001",
            "OPS_PATCH_V1",
            "MORALE",
            "High-density PVC patch with hook backing.",
            "/images/products/ops-patch.jpg",
            &["PVC", "HOOK_BACK", "50MM"],
            Some(ProductStatus::Popular),
        ),
        product(
            "KEY-092",
            "HEX_CHAIN_L2",
            "EDC",
            "Rubberized keychain with hexagonal pattern.",
            "/images/products/hex-chain.jpg",
            &["RUBBER", "HEX_GRID", "KEYRING"],
            Some(ProductStatus::New),
        ),
        product(
            "IND-442",
            "CORP_BRAND",
            "PROMO",
            "Corporate branding kit for industrial clients.",
            "/images/products/corp-brand.jpg",
            &["FULL_KIT", "CUSTOM", "BULK"],
            None,
        ),
        product(
            "FIG-X01",
            "UNIT_CREST",
            "MIL-SPEC",
            "Embroidered unit crest to original artwork.",
            "/images/products/unit-crest.jpg",
            &["EMBROIDERED", "MERROWED_EDGE"],
            Some(ProductStatus::Limited),
        ),
        product(
            "FSH-882",
            "STREET_TAG",
            "FASHION",
            "Woven label pack for streetwear drops.",
            "/images/products/street-tag.jpg",
            &["WOVEN", "IRON_ON"],
            None,
        ),
        product(
            "MED-119",
            "MEDIC_CROSS",
            "MORALE",
            "Reflective medic cross patch.",
            "/images/products/medic-cross.jpg",
            &["REFLECTIVE", "HOOK_BACK"],
            Some(ProductStatus::New),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_lists_everything() {
        let products = demo_products();
        let all = filter_products(&products, &CatalogQuery::default());
        assert_eq!(all.len(), products.len());
    }

    #[test]
    fn category_filter_is_exact() {
        let products = demo_products();
        let q = CatalogQuery {
            category: Some("MORALE".to_owned()),
            search: String::new(),
        };
        let hits = filter_products(&products, &q);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|p| p.category == "MORALE"));
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let products = demo_products();
        let q = CatalogQuery {
            category: None,
            search: "hex".to_owned(),
        };
        let hits = filter_products(&products, &q);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "HEX_CHAIN_L2");

        let q = CatalogQuery {
            category: None,
            search: "PATCH".to_owned(),
        };
        let hits = filter_products(&products, &q);
        // Matches the ops patch title and the medic patch description.
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn category_and_search_compose() {
        let products = demo_products();
        let q = CatalogQuery {
            category: Some("EDC".to_owned()),
            search: "hex".to_owned(),
        };
        let hits = filter_products(&products, &q);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "KEY-092");

        let q = CatalogQuery {
            category: Some("PROMO".to_owned()),
            search: "hex".to_owned(),
        };
        assert!(filter_products(&products, &q).is_empty());
    }

    #[test]
    fn counts_group_by_category_in_order() {
        let counts = category_counts(&demo_products());
        assert_eq!(counts[0], ("MORALE".to_owned(), 2));
        assert_eq!(counts.len(), 5);
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&ProductStatus::Limited).unwrap();
        assert_eq!(json, "\"LIMITED\"");
    }
}

//! Property-based tests using proptest
//! Tests invariants of address splitting and the completeness predicate
use property_info_api::geoclient::{split_address, split_house_and_street, Locality, LocalityKind};
use property_info_api::models::Property;
use proptest::prelude::*;

fn token() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]{1,8}"
}

// Property: splitting never panics and preserves every token
proptest! {
    #[test]
    fn split_address_never_panics(input in "\\PC*") {
        let _ = split_address(&input, LocalityKind::Borough);
        let _ = split_house_and_street(&input);
    }

    #[test]
    fn split_address_assigns_first_and_last_tokens(
        house in token(),
        street in prop::collection::vec(token(), 1..5),
        borough in token(),
    ) {
        let input = format!("{}  {} \t{}", house, street.join("   "), borough);
        let parts = split_address(&input, LocalityKind::Borough).unwrap();

        prop_assert_eq!(parts.house_number, house);
        prop_assert_eq!(parts.street, street.join(" "));
        prop_assert_eq!(parts.locality, Locality::Borough(borough));
    }

    #[test]
    fn house_and_street_rejoin_to_normalized_address(
        tokens in prop::collection::vec(token(), 2..6),
    ) {
        let (house, street) = split_house_and_street(&tokens.join("  ")).unwrap();
        prop_assert_eq!(format!("{} {}", house, street), tokens.join(" "));
    }

    #[test]
    fn single_token_never_splits(only in token()) {
        prop_assert!(split_house_and_street(&only).is_none());
        prop_assert!(split_address(&only, LocalityKind::Zip).is_none());
    }
}

fn fully_populated(address: &str) -> Property {
    Property {
        id: None,
        address: address.to_string(),
        property_type: Some("Single Family".into()),
        size: Some(2000.0),
        year_built: Some(1995),
        listing_price: Some(350_000.0),
        last_sold_price: Some(300_000.0),
        rent_estimate: Some(2200.0),
        days_on_market: Some(35),
        price_per_sqft: Some(175.0),
        estimated_value_zillow: Some(355_000.0),
        estimated_value_redfin: Some(360_000.0),
        photos: Some("url1,url2,url3".into()),
        description: Some("Beautiful home".into()),
        gross_yield: Some(0.075),
        cap_rate: Some(0.065),
        historical_prices: Some("{}".into()),
        tax_history: Some("{}".into()),
        hoa_fees: Some(200.0),
        hoa_rules: Some("No RVs".into()),
        roi_inputs: Some("{}".into()),
    }
}

/// Clears the descriptive field at `index` (column order).
fn clear_field(property: &mut Property, index: usize) {
    match index {
        0 => property.property_type = None,
        1 => property.size = None,
        2 => property.year_built = None,
        3 => property.listing_price = None,
        4 => property.last_sold_price = None,
        5 => property.rent_estimate = None,
        6 => property.days_on_market = None,
        7 => property.price_per_sqft = None,
        8 => property.estimated_value_zillow = None,
        9 => property.estimated_value_redfin = None,
        10 => property.photos = None,
        11 => property.description = None,
        12 => property.gross_yield = None,
        13 => property.cap_rate = None,
        14 => property.historical_prices = None,
        15 => property.tax_history = None,
        16 => property.hoa_fees = None,
        17 => property.hoa_rules = None,
        _ => property.roi_inputs = None,
    }
}

// Property: completeness holds iff no descriptive field is missing
proptest! {
    #[test]
    fn fully_populated_row_is_complete(address in "\\PC*", id in proptest::option::of(any::<i32>())) {
        let mut property = fully_populated(&address);
        property.id = id;
        prop_assert!(property.is_complete());
    }

    #[test]
    fn any_missing_field_makes_row_incomplete(
        cleared in prop::collection::btree_set(0usize..19, 1..19),
    ) {
        let mut property = fully_populated("123 Broadway");
        for index in &cleared {
            clear_field(&mut property, *index);
        }

        prop_assert!(!property.is_complete());
        let missing = property.missing_fields();
        prop_assert_eq!(missing.len(), cleared.len());
        for index in &cleared {
            prop_assert!(missing.contains(&Property::DESCRIPTIVE_FIELDS[*index]));
        }
    }
}

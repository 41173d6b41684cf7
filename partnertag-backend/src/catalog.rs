//! Built-in category catalog and catalog files.

use anyhow::{Context, Result};
use partnertag_core::{Category, CategoryCatalog};
use std::fs;
use std::path::Path;

/// Default taxonomy served by the statement backend.
pub fn default_catalog() -> CategoryCatalog {
    let categories = vec![
        Category::new(
            "Income",
            "💰",
            &[
                "Salary",
                "Family Benefits",
                "Social Benefits",
                "Pension Income",
                "Unemployment Benefits",
                "Received Alimony & Allowance",
                "Interest & Capital Income",
                "Dividends",
                "Crypto Income",
                "Grants",
                "Rental Income",
                "Taxes",
                "Income (Other)",
            ],
        ),
        Category::new(
            "Home",
            "🏠",
            &[
                "Utility bills",
                "Electricity",
                "Gas",
                "Heating",
                "Water & Sewerage",
                "TV, Phone & Internet",
                "Mortgage Instalments",
                "Security",
                "Housekeeping Service",
                "Rent",
                "Home Repairs",
                "Furnishings & Interior",
                "Garden",
                "Home (Other)",
            ],
        ),
        Category::new(
            "Transport",
            "🚗",
            &[
                "Public Transportation",
                "Gas & Fuel",
                "Parking",
                "Taxis",
                "Car Services",
                "Car Loan & Lease Payment",
                "Transport (Other)",
            ],
        ),
        Category::new(
            "Children",
            "👶",
            &[
                "Children's Education",
                "Children's Hobbies",
                "Children's Toys",
                "Children's Clothing",
                "Pocket Money",
                "Babysitting",
                "Alimony & Allowance",
                "Childcare Products",
                "Children (Other)",
            ],
        ),
        Category::new(
            "Health & Beauty",
            "💆",
            &[
                "Beauty Products",
                "Barber & Hairdressing",
                "Pharmacy & Drugs",
                "Spa, Massage & Personal Care",
                "Doctors & Healthcare",
                "Health & Beauty (Other)",
            ],
        ),
        Category::new(
            "Insurance",
            "🛡️",
            &[
                "Home Insurance",
                "Car insurance",
                "Life Insurance",
                "Travel Insurance",
                "Insurance (Other)",
            ],
        ),
        Category::new(
            "Other Expenses",
            "🔢",
            &[
                "ATMs & Cash Withdrawals",
                "Financial Service Fees",
                "Taxes & State Fees",
                "Interests",
                "Payments to private people",
                "Consumption Loan Instalments",
                "Business Services Fees",
                "Other Expenses (Other)",
            ],
        ),
        Category::new(
            "Shopping & Services",
            "🛍️",
            &[
                "Household Goods",
                "Clothing & Shoes",
                "Gifts",
                "Electronics & Computers",
                "Cleaning & Clothing Repairs",
                "Tobacco",
                "Jewellery & Accessories",
                "Flowers, Art & Minor Items",
                "Shopping & Services (Other)",
            ],
        ),
        Category::new(
            "Leisure & Lifestyle",
            "🎭",
            &[
                "Subscriptions & Media",
                "Movies, Theatres, Concerts",
                "Gym & Sports",
                "Parties & Celebrations",
                "Bars, Pubs & Nightclubs",
                "Charity & Donations",
                "Lotteries & Bets",
                "Outdoor Activities",
                "Skiing & Winter Sports",
                "Fishing & Hunting",
                "Arts & Crafts",
                "Sailing & Water Sports",
                "Cycling",
                "Music & Instruments",
                "Leisure & Lifestyle (Other)",
            ],
        ),
        Category::new(
            "Education",
            "📚",
            &[
                "Books, Newspapers & Magazines",
                "Tuition & Courses",
                "Stationery",
                "Student Loan Payment",
                "Education (Other)",
            ],
        ),
        Category::new(
            "Vacation & Travel",
            "✈️",
            &[
                "Hotels & Accommodation",
                "Airline Travel",
                "Car Rental",
                "Trains",
                "Travel Agency",
                "Recreation & Entertainment",
                "Vacation & Travel (Other)",
            ],
        ),
        Category::new(
            "Investments & Savings",
            "📈",
            &[
                "Regular Savings",
                "Pension Savings",
                "Investments & Securities",
                "Easy Saver",
                "Crypto & NFTs",
                "Investments & Savings (Other)",
            ],
        ),
        Category::new(
            "Pets",
            "🐾",
            &[
                "Food",
                "Health",
                "Toys",
                "Services",
                "Clothing & Accessories",
                "Pets (Other)",
            ],
        ),
        Category::new(
            "Food",
            "🍽️",
            &[
                "Supermarkets",
                "Restaurants & Cafes",
                "Fast Food Restaurants",
                "Convenience Stores & Kiosks",
                "Alcohol",
                "Food (Other)",
            ],
        ),
        Category::new("Uncategorized Expenses", "❓", &[]),
        Category::new(
            "Exclude From Budget",
            "🚫",
            &["Transfers Between Own Accounts", "Exclude From Budget (Other)"],
        ),
    ];

    // The table above is fixed and covered by tests; fall back to empty only
    // if someone breaks it.
    CategoryCatalog::new(categories).unwrap_or_default()
}

/// Load a catalog from a JSON file in the `/get_categories` wire shape.
pub fn load_catalog_file(path: &Path) -> Result<CategoryCatalog> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    CategoryCatalog::from_json(value).with_context(|| format!("validate {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 16);
        assert_eq!(catalog.iter().next().unwrap().name, "Income");
    }

    #[test]
    fn test_uncategorized_is_the_only_terminal_category() {
        let terminal: Vec<_> = default_catalog()
            .iter()
            .filter(|c| c.is_terminal())
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(terminal, vec!["Uncategorized Expenses"]);
    }

    #[test]
    fn test_catalog_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        fs::write(&path, default_catalog().to_json().to_string()).unwrap();
        assert_eq!(load_catalog_file(&path).unwrap(), default_catalog());
    }

    #[test]
    fn test_catalog_file_rejects_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        fs::write(&path, r#"{"Food": {"emoji": "x", "subcategories": ["", "Dining"]}}"#).unwrap();
        let err = load_catalog_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("blank subcategory"));
    }
}

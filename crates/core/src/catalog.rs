use rand::{seq::SliceRandom, Rng};

use crate::product::{Price, Product};

pub const CATEGORIES: [&str; 10] = [
    "Electronics",
    "Clothing",
    "Home & Garden",
    "Sports & Outdoors",
    "Books",
    "Toys & Games",
    "Beauty & Personal Care",
    "Automotive",
    "Food & Beverages",
    "Health & Wellness",
];

// `{}` is replaced by a material adjective. Rows line up with CATEGORIES.
const NAME_TEMPLATES: [[&str; 10]; 10] = [
    [
        "Wireless {} Headphones",
        "Bluetooth {} Speaker",
        "Smart {} Watch",
        "{} Laptop",
        "{} Smartphone",
        "{} Tablet",
        "USB {} Charger",
        "{} Monitor",
        "{} Keyboard",
        "{} Mouse",
    ],
    [
        "Cotton {} T-Shirt",
        "{} Denim Jeans",
        "{} Hoodie",
        "{} Dress",
        "{} Jacket",
        "{} Sneakers",
        "{} Boots",
        "{} Cap",
        "{} Scarf",
        "{} Sweater",
    ],
    [
        "{} Lamp",
        "{} Pillow Set",
        "{} Curtains",
        "{} Rug",
        "{} Plant Pot",
        "{} Garden Tools",
        "{} Bedding Set",
        "{} Wall Art",
        "{} Storage Box",
        "{} Chair",
    ],
    [
        "{} Yoga Mat",
        "{} Dumbbells",
        "{} Running Shoes",
        "{} Backpack",
        "{} Tent",
        "{} Bicycle",
        "{} Football",
        "{} Tennis Racket",
        "{} Swimming Goggles",
        "{} Fitness Tracker",
    ],
    [
        "The Art of {}",
        "{}: A Complete Guide",
        "Learning {}",
        "{} for Beginners",
        "Advanced {}",
        "The {} Cookbook",
        "{} Stories",
        "History of {}",
        "{} Encyclopedia",
        "The {} Journey",
    ],
    [
        "{} Building Blocks",
        "{} Board Game",
        "{} Puzzle",
        "{} Action Figure",
        "{} Doll",
        "{} Remote Car",
        "{} Card Game",
        "{} Plush Toy",
        "{} Science Kit",
        "{} Art Set",
    ],
    [
        "{} Face Cream",
        "{} Shampoo",
        "{} Perfume",
        "{} Lipstick",
        "{} Foundation",
        "{} Hair Oil",
        "{} Body Lotion",
        "{} Nail Polish",
        "{} Eye Shadow",
        "{} Sunscreen",
    ],
    [
        "{} Car Cover",
        "{} Floor Mats",
        "{} Phone Mount",
        "{} Seat Cushion",
        "{} Air Freshener",
        "{} Dash Cam",
        "{} Tool Kit",
        "{} Jump Starter",
        "{} Tire Inflator",
        "{} Car Charger",
    ],
    [
        "Organic {} Tea",
        "{} Coffee Beans",
        "Gourmet {} Chocolate",
        "{} Honey",
        "{} Olive Oil",
        "{} Protein Powder",
        "{} Energy Bars",
        "{} Dried Fruits",
        "{} Spice Mix",
        "{} Snack Pack",
    ],
    [
        "{} Vitamins",
        "{} Supplements",
        "{} Essential Oil",
        "{} Massage Tool",
        "{} First Aid Kit",
        "{} Thermometer",
        "{} Blood Pressure Monitor",
        "{} Heating Pad",
        "{} Ice Pack",
        "{} Pill Organizer",
    ],
];

/// Whole-unit price bounds per category, inclusive.
const PRICE_RANGES: [(u64, u64); 10] = [
    (29, 1999),
    (9, 299),
    (14, 499),
    (19, 599),
    (7, 79),
    (9, 149),
    (4, 199),
    (9, 299),
    (4, 99),
    (9, 149),
];

const STOCK_RANGE: std::ops::Range<u32> = 10..1000;

const MATERIALS: &[&str] = &[
    "Steel", "Wooden", "Concrete", "Plastic", "Cotton", "Granite", "Rubber", "Metal", "Soft",
    "Fresh", "Frozen", "Leather", "Silk", "Wool", "Linen", "Marble", "Iron", "Bronze", "Copper",
    "Aluminum", "Paper", "Glass",
];

const COLORS: &[&str] = &[
    "red", "green", "blue", "yellow", "purple", "mint green", "teal", "white", "black", "orange",
    "pink", "grey", "maroon", "violet", "turquoise", "tan", "sky blue", "salmon", "plum",
    "orchid", "olive", "magenta", "lime", "ivory", "indigo", "gold", "fuchsia", "cyan", "azure",
    "lavender", "silver",
];

const QUALITIES: &[&str] = &[
    "Premium",
    "High-quality",
    "Professional",
    "Deluxe",
    "Essential",
    "Classic",
    "Modern",
    "Innovative",
];

const PRIMARY_FEATURES: &[&str] = &[
    "durable",
    "lightweight",
    "ergonomic",
    "stylish",
    "eco-friendly",
    "versatile",
    "compact",
    "reliable",
];

const SECONDARY_FEATURES: &[&str] = &[
    "easy to use",
    "long-lasting",
    "affordable",
    "top-rated",
    "best-selling",
    "customer favorite",
    "highly recommended",
    "value for money",
];

const LOREM: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "ad", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi",
    "aliquip", "ex", "ea", "commodo", "consequat",
];

const SENTENCE_WORDS: usize = 10;

/// Generates synthetic catalog entries spread evenly across categories.
pub struct CatalogGenerator<R> {
    rng: R,
}

impl<R: Rng> CatalogGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Builds the product at position `index` of the seeded catalog.
    ///
    /// The category cycles with `index` and the name ends in `#{index + 1}`,
    /// so names stay unique across a run.
    pub fn product(&mut self, index: usize) -> Product {
        let category_index = index % CATEGORIES.len();
        let category = CATEGORIES[category_index];

        let template = pick(&mut self.rng, &NAME_TEMPLATES[category_index]);
        let material = pick(&mut self.rng, MATERIALS);
        let color = pick(&mut self.rng, COLORS);
        let name = format!("{} {color} #{}", template.replace("{}", material), index + 1);

        let price = self.price(category_index);
        let description = self.description(&name, category);
        let stock = self.rng.gen_range(STOCK_RANGE);

        Product {
            name,
            description,
            price,
            category: category.to_string(),
            stock,
        }
    }

    fn price(&mut self, category_index: usize) -> Price {
        let (min, max) = PRICE_RANGES[category_index];
        Price::from_cents(self.rng.gen_range(min * 100..=max * 100))
    }

    fn description(&mut self, name: &str, category: &str) -> String {
        let quality = pick(&mut self.rng, QUALITIES);
        let primary = pick(&mut self.rng, PRIMARY_FEATURES);
        let secondary = pick(&mut self.rng, SECONDARY_FEATURES);
        let sentence = self.sentence();
        format!(
            "{quality} {name} in {category} category. Features: {primary} and {secondary}. {sentence}"
        )
    }

    fn sentence(&mut self) -> String {
        let words: Vec<&str> = (0..SENTENCE_WORDS)
            .map(|_| pick(&mut self.rng, LOREM))
            .collect();
        let mut sentence = words.join(" ");
        if let Some(first) = sentence.get(..1) {
            let upper = first.to_ascii_uppercase();
            sentence.replace_range(..1, &upper);
        }
        sentence.push('.');
        sentence
    }
}

fn pick<'a, R: Rng>(rng: &mut R, options: &[&'a str]) -> &'a str {
    // Every table above is non-empty.
    options.choose(rng).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn generator(seed: u64) -> CatalogGenerator<StdRng> {
        CatalogGenerator::new(StdRng::seed_from_u64(seed))
    }

    #[test]
    fn categories_cycle_with_index() {
        let mut catalog = generator(7);
        for index in 0..25 {
            let product = catalog.product(index);
            assert_eq!(product.category, CATEGORIES[index % 10]);
        }
    }

    #[test]
    fn names_carry_one_based_suffix() {
        let mut catalog = generator(1);
        let first = catalog.product(0);
        let twelfth = catalog.product(11);
        assert!(first.name.ends_with(" #1"), "got {}", first.name);
        assert!(twelfth.name.ends_with(" #12"), "got {}", twelfth.name);
        assert!(!first.name.contains("{}"));
    }

    #[test]
    fn prices_and_stock_stay_in_category_bounds() {
        let mut catalog = generator(42);
        for index in 0..500 {
            let product = catalog.product(index);
            let (min, max) = PRICE_RANGES[index % 10];
            let cents = product.price.cents();
            assert!(
                (min * 100..=max * 100).contains(&cents),
                "{} priced {} outside {min}..={max}",
                product.category,
                product.price
            );
            assert!(STOCK_RANGE.contains(&product.stock));
        }
    }

    #[test]
    fn description_mentions_name_and_category() {
        let mut catalog = generator(3);
        let product = catalog.product(4);
        assert!(product.description.contains(&product.name));
        assert!(product.description.contains("in Books category. Features: "));
        assert!(product.description.ends_with('.'));
    }

    #[test]
    fn same_seed_produces_same_catalog() {
        let mut left = generator(99);
        let mut right = generator(99);
        for index in 0..20 {
            assert_eq!(left.product(index), right.product(index));
        }
    }
}

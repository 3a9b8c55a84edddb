//! Extractor for the storefront's category listings and product pages
//!
//! # Markup
//!
//! | Data | Location |
//! |------|----------|
//! | page count | last numeric `span` inside `ul.items.pages-items` |
//! | product links | `ol.products.list.items.product-items` > `li.item.product.product-item` > `a.product-item-link` |
//! | species | `h1.page-title` |
//! | description | `div.value[itemprop=description]` |
//! | care sections | `div[data-content-type=block]`, heading in a styled `b` |

use crate::extract::html::{find_all, find_first, find_tags, text_of, SelectorKind};
use crate::extract::{ExtractError, Extractor, ProductContext, ProductRecord};
use scraper::{ElementRef, Html};

const HEADING_STYLE: &str = "font-size: 1.75em; font-family: questrial;";
const CARE_SUFFIX: &str = " CARE";

/// Record fields filled from labeled care sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Location,
    Lighting,
    WaterFlow,
    Feeding,
    Propagation,
}

impl Field {
    /// Zero-based `p` within the section that holds the value
    pub fn paragraph(self) -> usize {
        match self {
            Field::Location | Field::Lighting => 0,
            Field::WaterFlow | Field::Feeding | Field::Propagation => 1,
        }
    }

    fn slot(self, record: &mut ProductRecord) -> &mut Option<String> {
        match self {
            Field::Location => &mut record.location,
            Field::Lighting => &mut record.lighting,
            Field::WaterFlow => &mut record.water_flow,
            Field::Feeding => &mut record.feeding,
            Field::Propagation => &mut record.propagation,
        }
    }
}

/// Normalized section heading to field
const KNOWN_LABELS: &[(&str, Field)] = &[
    ("LOCATION", Field::Location),
    ("LIGHTING", Field::Lighting),
    ("WATER FLOW", Field::WaterFlow),
    ("FEEDING", Field::Feeding),
    ("PROPAGATION", Field::Propagation),
];

/// Headings that are recognized but carry nothing worth keeping
const IGNORED_LABELS: &[&str] = &["ACCLIMATION"];

/// Classified care section heading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Known(Field),
    Ignored,
    /// `<FAMILY> CARE`, holding the capitalized family name
    Care(String),
    Unrecognized(String),
}

impl Label {
    /// Classifies a raw heading
    ///
    /// Case and inner whitespace are normalized for matching only; an
    /// unrecognized heading keeps its inner spacing.
    pub fn parse(raw: &str) -> Self {
        let verbatim = raw.trim().to_uppercase();
        let normalized = verbatim.split_whitespace().collect::<Vec<_>>().join(" ");

        if let Some((_, field)) = KNOWN_LABELS.iter().find(|(name, _)| *name == normalized) {
            return Label::Known(*field);
        }

        if IGNORED_LABELS.contains(&normalized.as_str()) {
            return Label::Ignored;
        }

        match normalized.strip_suffix(CARE_SUFFIX) {
            Some(family) if !family.is_empty() => Label::Care(capitalize(family)),
            _ => Label::Unrecognized(verbatim),
        }
    }
}

/// First letter upper case, the rest lower case
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Text of the `index`-th paragraph of a section
fn paragraph_text(section: ElementRef<'_>, index: usize) -> Option<String> {
    find_tags(section, "p").get(index).copied().and_then(text_of)
}

/// Extractor for the storefront markup described in the module docs
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogExtractor;

impl CatalogExtractor {
    pub fn new() -> Self {
        Self
    }

    fn apply_section(&self, section: ElementRef<'_>, record: &mut ProductRecord) {
        let style = [("style", HEADING_STYLE)];
        let Some(heading) = find_first(section, "b", SelectorKind::Attrs(&style)) else {
            return;
        };
        let Some(raw) = text_of(heading) else {
            return;
        };

        match Label::parse(&raw) {
            Label::Known(field) => {
                if let Some(text) = paragraph_text(section, field.paragraph()) {
                    *field.slot(record) = Some(text);
                }
            }
            Label::Ignored => {}
            Label::Care(family) => {
                record.family = Some(family);
                if let Some(text) = paragraph_text(section, 0) {
                    record.care_description = Some(text);
                }
            }
            Label::Unrecognized(label) => record.unrecognized_labels.push(label),
        }
    }
}

impl Extractor for CatalogExtractor {
    fn extract_index(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let Some(list) = find_first(
            root,
            "ol",
            SelectorKind::Class("products list items product-items"),
        ) else {
            tracing::debug!("No product list on index page");
            return Vec::new();
        };

        find_all(list, "li", SelectorKind::Class("item product product-item"))
            .into_iter()
            .filter_map(|card| find_first(card, "a", SelectorKind::Class("product-item-link")))
            .filter_map(|anchor| anchor.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
            .collect()
    }

    fn extract_total_pages(&self, html: &str) -> Result<u32, ExtractError> {
        let document = Html::parse_document(html);

        let Some(pager) = find_first(
            document.root_element(),
            "ul",
            SelectorKind::Class("items pages-items"),
        ) else {
            // listings that fit on one page render no pager
            return Ok(1);
        };

        let last = find_tags(pager, "span")
            .into_iter()
            .filter_map(text_of)
            .filter(|text| text.chars().all(|c| c.is_ascii_digit()))
            .last()
            .ok_or_else(|| ExtractError::MalformedPagination("no numeric page label".to_string()))?;

        match last.parse::<u32>() {
            Ok(0) => Err(ExtractError::MalformedPagination(
                "page count of zero".to_string(),
            )),
            Ok(total) => Ok(total),
            Err(e) => Err(ExtractError::MalformedPagination(format!(
                "page label '{}': {}",
                last, e
            ))),
        }
    }

    fn extract_product(&self, html: &str, context: &ProductContext) -> ProductRecord {
        let document = Html::parse_document(html);
        let root = document.root_element();
        let mut record = ProductRecord::new(context);

        record.species =
            find_first(root, "h1", SelectorKind::Class("page-title")).and_then(text_of);

        let description = [("class", "value"), ("itemprop", "description")];
        record.description =
            find_first(root, "div", SelectorKind::Attrs(&description)).and_then(text_of);

        let block = [("data-content-type", "block")];
        for section in find_all(root, "div", SelectorKind::Attrs(&block)) {
            self.apply_section(section, &mut record);
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(label: &str, paragraphs: &[&str]) -> String {
        let body: String = paragraphs.iter().map(|p| format!("<p>{}</p>", p)).collect();
        format!(
            r#"<div data-content-type="block"><b style="{}">{}</b>{}</div>"#,
            HEADING_STYLE, label, body
        )
    }

    fn product_page(sections: &[String]) -> String {
        format!(
            r#"<html><body>
                <h1 class="page-title"><span>  Green Slimer Acropora </span></h1>
                <div class="product attribute overview">
                    <div class="value" itemprop="description"> A fast growing staghorn. </div>
                </div>
                {}
            </body></html>"#,
            sections.join("\n")
        )
    }

    fn context() -> ProductContext {
        ProductContext {
            category: "corals/sps".to_string(),
            index_page: 2,
            product_position: 3,
        }
    }

    #[test]
    fn test_label_table() {
        assert_eq!(Label::parse("Location"), Label::Known(Field::Location));
        assert_eq!(Label::parse(" water   flow "), Label::Known(Field::WaterFlow));
        assert_eq!(Label::parse("FEEDING"), Label::Known(Field::Feeding));
        assert_eq!(Label::parse("Acclimation"), Label::Ignored);
        assert_eq!(
            Label::parse("ACROPORA CARE"),
            Label::Care("Acropora".to_string())
        );
        assert_eq!(
            Label::parse("soft coral care"),
            Label::Care("Soft coral".to_string())
        );
        assert_eq!(
            Label::parse("Placement"),
            Label::Unrecognized("PLACEMENT".to_string())
        );
        assert_eq!(Label::parse("CARE"), Label::Unrecognized("CARE".to_string()));
    }

    #[test]
    fn test_unrecognized_label_keeps_inner_spacing() {
        assert_eq!(
            Label::parse("  Placement   Tips \n"),
            Label::Unrecognized("PLACEMENT   TIPS".to_string())
        );
        assert_eq!(
            Label::parse("Water \n Flow"),
            Label::Known(Field::WaterFlow)
        );
        assert_eq!(
            Label::parse("  soft   coral  care "),
            Label::Care("Soft coral".to_string())
        );
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("ZOANTHID"), "Zoanthid");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_extract_index() {
        let html = r#"
            <ol class="products list items product-items">
                <li class="item product product-item">
                    <a class="product-item-photo" href="/ignored.html"></a>
                    <a class="product-item-link" href="https://shop.example.com/a.html">A</a>
                </li>
                <li class="item product product-item">
                    <a class="product-item-link" href=" /b.html ">B</a>
                </li>
                <li class="item product product-item"><span>no link</span></li>
                <li class="item product product-item">
                    <a class="product-item-link" href="https://shop.example.com/c.html">C</a>
                </li>
            </ol>
            <ol class="other"><li class="item product product-item">
                <a class="product-item-link" href="/outside.html">X</a>
            </li></ol>
        "#;

        let urls = CatalogExtractor::new().extract_index(html);
        assert_eq!(
            urls,
            vec![
                "https://shop.example.com/a.html",
                "/b.html",
                "https://shop.example.com/c.html"
            ]
        );
    }

    #[test]
    fn test_extract_index_without_list() {
        let urls = CatalogExtractor::new().extract_index("<html><body>Nothing</body></html>");
        assert!(urls.is_empty());
    }

    #[test]
    fn test_extract_total_pages() {
        let html = r#"
            <ul class="items pages-items">
                <li><span>Page</span><span>1</span></li>
                <li><span>2</span></li>
                <li><span>7</span></li>
                <li><span>Next</span></li>
            </ul>
        "#;
        assert_eq!(CatalogExtractor::new().extract_total_pages(html), Ok(7));
    }

    #[test]
    fn test_extract_total_pages_without_pager() {
        let html = "<html><body><ol></ol></body></html>";
        assert_eq!(CatalogExtractor::new().extract_total_pages(html), Ok(1));
    }

    #[test]
    fn test_extract_total_pages_malformed() {
        let html = r#"<ul class="items pages-items"><li><span>Next</span></li></ul>"#;
        assert!(matches!(
            CatalogExtractor::new().extract_total_pages(html),
            Err(ExtractError::MalformedPagination(_))
        ));

        let zero = r#"<ul class="items pages-items"><li><span>0</span></li></ul>"#;
        assert!(CatalogExtractor::new().extract_total_pages(zero).is_err());
    }

    #[test]
    fn test_extract_product_all_fields() {
        let html = product_page(&[
            section("Acropora Care", &["Needs stable parameters."]),
            section("Location", &["Upper third of the tank."]),
            section("Lighting", &["High."]),
            section("Water Flow", &["Water Flow", "Strong, random."]),
            section("Feeding", &["Feeding", "Photosynthetic."]),
            section("Propagation", &["Propagation", "Fragment with bone cutters."]),
            section("Acclimation", &["Drip for an hour."]),
        ]);

        let record = CatalogExtractor::new().extract_product(&html, &context());

        assert_eq!(record.category, "corals/sps");
        assert_eq!(record.index_page, 2);
        assert_eq!(record.product_position, 3);
        assert_eq!(record.species.as_deref(), Some("Green Slimer Acropora"));
        assert_eq!(record.description.as_deref(), Some("A fast growing staghorn."));
        assert_eq!(record.family.as_deref(), Some("Acropora"));
        assert_eq!(
            record.care_description.as_deref(),
            Some("Needs stable parameters.")
        );
        assert_eq!(record.location.as_deref(), Some("Upper third of the tank."));
        assert_eq!(record.lighting.as_deref(), Some("High."));
        assert_eq!(record.water_flow.as_deref(), Some("Strong, random."));
        assert_eq!(record.feeding.as_deref(), Some("Photosynthetic."));
        assert_eq!(
            record.propagation.as_deref(),
            Some("Fragment with bone cutters.")
        );
        assert!(record.unrecognized_labels.is_empty());
    }

    #[test]
    fn test_unrecognized_label_is_recorded_not_fatal() {
        let html = product_page(&[
            section("Location", &["Anywhere."]),
            section("Placement Tips", &["Keep away from pumps."]),
            section("Lighting", &["Moderate."]),
        ]);

        let record = CatalogExtractor::new().extract_product(&html, &context());

        assert_eq!(record.unrecognized_labels, vec!["PLACEMENT TIPS"]);
        assert_eq!(record.location.as_deref(), Some("Anywhere."));
        assert_eq!(record.lighting.as_deref(), Some("Moderate."));
        assert_eq!(record.species.as_deref(), Some("Green Slimer Acropora"));
    }

    #[test]
    fn test_missing_elements_leave_fields_empty() {
        let html = format!(
            "<html><body>{}{}<div data-content-type=\"block\"><p>no heading</p></div></body></html>",
            section("Water Flow", &["only the heading paragraph"]),
            section("Feeding", &[]),
        );

        let record = CatalogExtractor::new().extract_product(&html, &context());

        assert_eq!(record.species, None);
        assert_eq!(record.description, None);
        assert_eq!(record.water_flow, None);
        assert_eq!(record.feeding, None);
        assert!(record.unrecognized_labels.is_empty());
    }

    #[test]
    fn test_garbage_input_does_not_panic() {
        let extractor = CatalogExtractor::new();
        let record = extractor.extract_product("<<<not html", &context());
        assert_eq!(record.category, "corals/sps");
        assert!(extractor.extract_index("").is_empty());
        assert_eq!(extractor.extract_total_pages(""), Ok(1));
    }
}

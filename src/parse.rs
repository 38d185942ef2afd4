use log::warn;
use scraper::{ElementRef, Html, Selector};

use crate::models::{RawListing, MISSING};

/// Extracts job cards from one page of Jooble search results. The
/// selectors are the site's current markup and change with its layout;
/// nothing outside this module knows about them.
pub struct PageParser {
    card: Selector,
    title: Selector,
    company: Selector,
    location: Selector,
    posted: Selector,
    description: Selector,
}

impl PageParser {
    pub fn new() -> Self {
        Self {
            card: sel("div[data-test-name='_jobCard']"),
            title: sel("h2.sXM9Eq"),
            company: sel("p.z6WlhX"),
            location: sel("div.caption.NTRJBV"),
            posted: sel("div.caption.Vk-5Da"),
            description: sel("div.PAM72f"),
        }
    }

    /// Every card yields a listing; fields the card lacks default to the
    /// "N/A" sentinel independently. An empty vec is the normal signal
    /// that the results ran out.
    pub fn parse(&self, html: &str) -> Vec<RawListing> {
        let document = Html::parse_document(html);
        let mut listings = Vec::new();

        for card in document.select(&self.card) {
            let listing = RawListing {
                title: text_or_missing(&card, &self.title),
                company: text_or_missing(&card, &self.company),
                location: text_or_missing(&card, &self.location),
                posted_time: text_or_missing(&card, &self.posted),
                description: text_or_missing(&card, &self.description),
                jobkey: card
                    .value()
                    .attr("id")
                    .map(str::to_string)
                    .unwrap_or_else(|| MISSING.to_string()),
            };

            // A card with nothing extractable is markup noise, not a job.
            if listing.title == MISSING && listing.company == MISSING && listing.jobkey == MISSING
            {
                warn!("Skipping job card with no extractable fields");
                continue;
            }

            listings.push(listing);
        }

        listings
    }
}

impl Default for PageParser {
    fn default() -> Self {
        Self::new()
    }
}

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("selector literal")
}

fn text_or_missing(card: &ElementRef, selector: &Selector) -> String {
    card.select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| MISSING.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_card(id: &str, title: &str, company: &str) -> String {
        format!(
            r#"<div data-test-name="_jobCard" id="{id}">
                 <h2 class="sXM9Eq">{title}</h2>
                 <p class="z6WlhX">{company}</p>
                 <div class="caption NTRJBV">Milano</div>
                 <div class="caption Vk-5Da">2 giorni fa</div>
                 <div class="PAM72f">Cerchiamo una persona motivata.</div>
               </div>"#
        )
    }

    #[test]
    fn test_parse_full_card() {
        let html = format!("<html><body>{}</body></html>", full_card("job-1", "Senior Software Engineer", "Acme S.p.A."));
        let listings = PageParser::new().parse(&html);

        assert_eq!(listings.len(), 1);
        let job = &listings[0];
        assert_eq!(job.title, "Senior Software Engineer");
        assert_eq!(job.company, "Acme S.p.A.");
        assert_eq!(job.location, "Milano");
        assert_eq!(job.posted_time, "2 giorni fa");
        assert_eq!(job.description, "Cerchiamo una persona motivata.");
        assert_eq!(job.jobkey, "job-1");
    }

    #[test]
    fn test_parse_defaults_missing_fields_independently() {
        let html = r#"<html><body>
            <div data-test-name="_jobCard" id="job-2">
                <h2 class="sXM9Eq">Insegnante di inglese</h2>
            </div>
        </body></html>"#;
        let listings = PageParser::new().parse(html);

        assert_eq!(listings.len(), 1);
        let job = &listings[0];
        assert_eq!(job.title, "Insegnante di inglese");
        assert_eq!(job.company, MISSING);
        assert_eq!(job.location, MISSING);
        assert_eq!(job.posted_time, MISSING);
        assert_eq!(job.description, MISSING);
    }

    #[test]
    fn test_parse_skips_empty_card_keeps_siblings() {
        let html = format!(
            r#"<html><body>
                <div data-test-name="_jobCard"></div>
                {}
            </body></html>"#,
            full_card("job-3", "Developer", "Beta Srl")
        );
        let listings = PageParser::new().parse(&html);

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].jobkey, "job-3");
    }

    #[test]
    fn test_parse_no_cards_is_empty_not_error() {
        let listings = PageParser::new().parse("<html><body><p>Nessun risultato</p></body></html>");
        assert!(listings.is_empty());
    }

    #[test]
    fn test_parse_ignores_unrelated_markup() {
        let html = format!(
            r#"<html><body>
                <div class="banner"><h2 class="sXM9Eq">Not a job</h2></div>
                {}
            </body></html>"#,
            full_card("job-4", "Programmatore", "Gamma")
        );
        let listings = PageParser::new().parse(&html);

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "Programmatore");
    }
}

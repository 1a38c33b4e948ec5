//! Generation and preview pipelines

use crate::job::JobReporter;
use crate::output::*;
use crate::types::*;
use chrono::Local;
use proxy_fetch::deck::{DeckSource, load_deck, save_deck_list};
use proxy_fetch::{CardEntry, Deck, Face, Fetcher, ImageVersion, ResolvedCard, image_url};
use proxy_layout::{
    BatchKind, DeckBatch, DeckPreview, DfcManifest, FormatMode, PlanStatistics, SheetCard, calculate_statistics,
    double_sided_batch, expand_counts, plan, standard_batch,
};
use proxy_pdf::{CardImage, generate_pdf, load_default_back};
use std::path::{Path, PathBuf};

/// Share of overall progress spent on decks; the rest covers combined output
const DECKS_SHARE: f32 = 0.95;
/// Share of each deck's progress spent fetching images
const FETCH_SHARE: f32 = 0.8;

const COMBINED_TITLE: &str = "Combined Double-Sided Cards (All Decks)";

/// Run a generation request to completion (or cancellation).
///
/// A deck that fails is reported and skipped; the caller decides the final
/// job status from the summary.
pub async fn run_generate(
    fetcher: &Fetcher,
    output_root: &Path,
    request: &GenerateRequest,
    reporter: &JobReporter,
) -> Result<GenerateSummary> {
    if request.sources.is_empty() {
        return Err(RuntimeError::NoDecks);
    }
    request.sheet.validate()?;

    let format = request.format();
    let default_back = match &request.default_back {
        Some(path) => match load_default_back(path).await {
            Ok(image) => Some(image),
            Err(e) => {
                reporter.warn(format!(
                    "Could not load default back image {}: {e}",
                    path.display()
                ));
                None
            }
        },
        None => None,
    };

    let root = if request.batch {
        output_root.join(batch_dir_name(Local::now()))
    } else {
        output_root.to_path_buf()
    };
    tokio::fs::create_dir_all(&root).await?;

    let combine_dfcs = request.batch && format == FormatMode::Smart;
    let mut combined: Vec<SheetCard<CardImage>> = Vec::new();
    let mut manifest = DfcManifest::new();
    let mut summary = GenerateSummary::default();

    let deck_count = request.sources.len();
    let deck_span = DECKS_SHARE / deck_count as f32;

    for (index, source) in request.sources.iter().enumerate() {
        if reporter.is_cancelled() {
            reporter.message("Cancelled before the next deck");
            summary.cancelled = true;
            break;
        }

        let progress = DeckProgress {
            reporter,
            base: index as f32 * deck_span,
            span: deck_span,
        };
        progress.report(0.0);
        reporter.message(format!(
            "Processing deck {}/{}: {}",
            index + 1,
            deck_count,
            source.describe()
        ));

        let context = DeckContext {
            fetcher,
            request,
            root: &root,
            default_back: default_back.as_ref(),
            combine_dfcs,
            fallback_name: format!("Deck {}", index + 1),
        };
        match process_deck(&context, source, &progress).await {
            Ok(output) => {
                summary.decks_processed += 1;
                summary.files.extend(output.files);
                summary.statistics = summary.statistics.merge(output.statistics);
                for card in output.double_faced {
                    manifest.push(output.name.clone(), card.name.clone());
                    combined.push(card);
                }
            }
            Err(e) => reporter.warn(format!("Error processing {}: {e}", source.describe())),
        }
    }

    if !combined.is_empty() && !summary.cancelled {
        reporter.message(format!(
            "Generating combined double-sided PDF ({} cards)",
            combined.len()
        ));
        let batch = double_sided_batch(&combined, default_back.as_ref());
        let path = root.join(COMBINED_PDF_NAME);
        match generate_pdf(&batch, &request.sheet, COMBINED_TITLE, &path).await {
            Ok(()) => {
                reporter.file_written(path.clone());
                summary.files.push(path);
                summary.statistics = summary
                    .statistics
                    .merge(calculate_statistics(std::slice::from_ref(&batch)));
            }
            Err(e) => reporter.warn(format!("Could not write {}: {e}", path.display())),
        }

        let manifest_path = root.join(MANIFEST_NAME);
        match tokio::fs::write(&manifest_path, manifest.render()).await {
            Ok(()) => {
                reporter.file_written(manifest_path.clone());
                summary.files.push(manifest_path);
            }
            Err(e) => reporter.warn(format!(
                "Could not write {}: {e}",
                manifest_path.display()
            )),
        }
    }
    reporter.progress(0.99);

    // Files already written stand even if the cleanup fails
    if request.purge_new {
        match fetcher.purge_new().await {
            Ok(removed) => reporter.message(format!("Purged {removed} newly downloaded images")),
            Err(e) => reporter.warn(format!("Could not purge newly downloaded images: {e}")),
        }
    }

    Ok(summary)
}

/// Maps one deck's local progress onto the job's overall progress
struct DeckProgress<'a> {
    reporter: &'a JobReporter,
    base: f32,
    span: f32,
}

impl DeckProgress<'_> {
    fn report(&self, fraction: f32) {
        self.reporter
            .progress(self.base + self.span * fraction.clamp(0.0, 1.0));
    }

    fn fetched(&self, done: usize, total: usize) {
        if total > 0 {
            self.report(FETCH_SHARE * done as f32 / total as f32);
        }
    }

    fn rendered(&self, done: usize, total: usize) {
        if total > 0 {
            self.report(FETCH_SHARE + (1.0 - FETCH_SHARE) * done as f32 / total as f32);
        }
    }
}

struct DeckContext<'a> {
    fetcher: &'a Fetcher,
    request: &'a GenerateRequest,
    root: &'a Path,
    default_back: Option<&'a CardImage>,
    combine_dfcs: bool,
    fallback_name: String,
}

struct DeckOutput {
    name: String,
    files: Vec<PathBuf>,
    statistics: PlanStatistics,
    /// Held back for the combined document
    double_faced: Vec<SheetCard<CardImage>>,
}

async fn process_deck(
    context: &DeckContext<'_>,
    source: &DeckSource,
    progress: &DeckProgress<'_>,
) -> Result<DeckOutput> {
    let reporter = progress.reporter;
    let request = context.request;
    let format = request.format();

    let transport = context.fetcher.transport();
    let deck = load_deck(source, transport.as_ref(), request.boards).await?;
    for warning in &deck.warnings {
        reporter.note(warning.clone());
    }

    let name = deck_name(&deck, source, &context.fallback_name);
    let title = footer_title(&name, deck.author.as_deref());
    reporter.message(format!("Deck: {name} ({} cards)", deck.card_count()));

    let folder = context.root.join(file_safe(&name));
    tokio::fs::create_dir_all(&folder).await?;
    save_deck_list(&deck.cards, folder.join(DECK_LIST_NAME)).await?;

    let resolution = context
        .fetcher
        .resolve(&deck.cards, format.needs_backs(), &|done, total| {
            progress.fetched(done, total)
        })
        .await;
    for warning in &resolution.warnings {
        reporter.note(warning.clone());
    }
    if format.needs_backs() {
        reporter.message(format!(
            "Double-faced cards: {}",
            resolution.double_faced_count()
        ));
    }

    let cards = expand_counts(
        resolution
            .cards
            .into_iter()
            .map(|card| {
                let count = card.entry.count as usize;
                (sheet_card(card), count)
            }),
    );

    let mut double_faced = Vec::new();
    let batches: Vec<DeckBatch<CardImage>> = if context.combine_dfcs {
        let (dfcs, sfcs): (Vec<_>, Vec<_>) = cards.into_iter().partition(|c| c.is_double_faced);
        double_faced = dfcs;
        if sfcs.is_empty() {
            Vec::new()
        } else {
            vec![standard_batch(&sfcs)]
        }
    } else {
        plan(&cards, format, context.default_back)
    };

    let mut files = Vec::with_capacity(batches.len());
    for (index, batch) in batches.iter().enumerate() {
        let path = folder.join(format!(
            "{}_{}.pdf",
            file_safe(&name),
            batch.kind.file_suffix()
        ));
        reporter.message(format!(
            "Building {} ({} pages)",
            path.display(),
            batch.pages.len()
        ));
        let file_title = batch_title(&title, format, batch.kind);
        generate_pdf(batch, &request.sheet, &file_title, &path).await?;
        reporter.file_written(path.clone());
        files.push(path);
        progress.rendered(index + 1, batches.len());
    }
    progress.report(1.0);

    Ok(DeckOutput {
        name,
        files,
        statistics: calculate_statistics(&batches),
        double_faced,
    })
}

/// Plan every deck for display without downloading or writing anything.
///
/// Double-faced status comes from the deck source's layout hint, or from a
/// back image already in the cache.
pub async fn build_preview(fetcher: &Fetcher, request: &PreviewRequest) -> Result<Vec<DeckPreview>> {
    if request.sources.is_empty() {
        return Err(RuntimeError::NoDecks);
    }

    let transport = fetcher.transport();
    let mut previews = Vec::with_capacity(request.sources.len());
    for (index, source) in request.sources.iter().enumerate() {
        let deck = match load_deck(source, transport.as_ref(), request.boards).await {
            Ok(deck) => deck,
            Err(e) => {
                log::warn!("Skipping {} in preview: {e}", source.describe());
                continue;
            }
        };
        let name = deck_name(&deck, source, &format!("Deck {}", index + 1));

        let mut cards = Vec::with_capacity(deck.cards.len());
        for entry in &deck.cards {
            let card = preview_card(fetcher, entry).await;
            cards.push((card, entry.count as usize));
        }
        let batches = plan(&expand_counts(cards), request.format, None);
        previews.push(DeckPreview::new(name, deck.author.clone(), &batches));
    }

    if previews.is_empty() {
        return Err(RuntimeError::NoDecks);
    }
    Ok(previews)
}

async fn preview_card(fetcher: &Fetcher, entry: &CardEntry) -> SheetCard<String> {
    let is_double_faced = match entry.is_double_faced {
        Some(hint) => hint,
        None => match entry.image_key(Face::Back) {
            Some(key) => fetcher.cache().get(&key).await.is_some(),
            None => false,
        },
    };

    let front = image_url(entry, Face::Front, ImageVersion::Normal).ok();
    let card = SheetCard::new(entry.name.clone(), front);
    if is_double_faced {
        card.with_back(image_url(entry, Face::Back, ImageVersion::Normal).ok())
    } else {
        card
    }
}

fn sheet_card(card: ResolvedCard) -> SheetCard<CardImage> {
    SheetCard {
        name: card.entry.name,
        front: card.front.map(CardImage::File),
        back: card.back.map(CardImage::File),
        is_double_faced: card.is_double_faced,
    }
}

/// Smart mode splits a deck in two files; the double-sided one is marked
fn batch_title(title: &str, format: FormatMode, kind: BatchKind) -> String {
    match (format, kind) {
        (FormatMode::Smart, BatchKind::DoubleSided) => format!("{title} (DFC)"),
        _ => title.to_string(),
    }
}

/// Custom name, then the source's own name, then the CSV file stem
fn deck_name(deck: &Deck, source: &DeckSource, fallback: &str) -> String {
    if let Some(name) = deck.name.as_deref().filter(|n| !n.trim().is_empty()) {
        return name.trim().to_string();
    }
    match source {
        DeckSource::Csv { path, .. } => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| fallback.to_string()),
        DeckSource::Archidekt { .. } => fallback.to_string(),
    }
}

/// `"<deck> - <author>"`, or just the deck name
pub fn footer_title(name: &str, author: Option<&str>) -> String {
    match author.filter(|a| !a.is_empty()) {
        Some(author) => format!("{name} - {author}"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footer_title() {
        assert_eq!(footer_title("Izzet", Some("me")), "Izzet - me");
        assert_eq!(footer_title("Izzet", None), "Izzet");
        assert_eq!(footer_title("Izzet", Some("")), "Izzet");
    }

    #[test]
    fn test_batch_title_marks_smart_double_sided() {
        assert_eq!(
            batch_title("Izzet - me", FormatMode::Smart, BatchKind::DoubleSided),
            "Izzet - me (DFC)"
        );
        assert_eq!(
            batch_title("Izzet - me", FormatMode::Smart, BatchKind::Standard),
            "Izzet - me"
        );
        assert_eq!(
            batch_title("Izzet - me", FormatMode::Both, BatchKind::DoubleSided),
            "Izzet - me"
        );
    }

    #[test]
    fn test_deck_name_falls_back_to_csv_stem() {
        let source = DeckSource::Csv {
            path: PathBuf::from("decks/elves.csv"),
            custom_name: None,
        };
        assert_eq!(deck_name(&Deck::default(), &source, "Deck 1"), "elves");

        let named = Deck {
            name: Some("Elfball".to_string()),
            ..Default::default()
        };
        assert_eq!(deck_name(&named, &source, "Deck 1"), "Elfball");
    }
}

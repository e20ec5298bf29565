//! Page composition
//!
//! Composing one [`PageData`] can produce zero pages (a restricted template
//! with no filler), or several: filler pages inserted to reach an allowed
//! position, the page itself, then continuation pages for content that
//! overflowed.

use crate::document::ComposedDocument;
use crate::fill::FillerRegistry;
use crate::page_data::PageData;
use crate::registry::AssemblyContext;
use crate::render::Canvas;
use crate::source::SourceHandle;
use crate::template::{PageRestriction, PositionRule};
use crate::transform::TransformRegistry;
use crate::types::*;
use std::borrow::Cow;

pub struct Composer<'a, 'r> {
    fillers: &'a FillerRegistry,
    transforms: &'a TransformRegistry,
    context: &'a AssemblyContext<'r>,
    page_limit: Option<usize>,
}

impl<'a, 'r> Composer<'a, 'r> {
    pub fn new(
        fillers: &'a FillerRegistry,
        transforms: &'a TransformRegistry,
        context: &'a AssemblyContext<'r>,
    ) -> Self {
        Self {
            fillers,
            transforms,
            context,
            page_limit: None,
        }
    }

    /// Fail with [`ComposeError::PageLimitExceeded`] rather than grow the
    /// document past `limit` pages
    pub fn with_page_limit(mut self, limit: Option<usize>) -> Self {
        self.page_limit = limit;
        self
    }

    /// Compose `page_data` onto the end of `document`.
    ///
    /// Returns the handles of every source page used, in page order: filler
    /// pages, the page itself, then its continuations.
    pub fn compose_page(
        &self,
        document: &mut ComposedDocument,
        page_data: &PageData,
    ) -> Result<Vec<SourceHandle>> {
        self.compose_chain(document, page_data, &[])
    }

    /// Compose a page and its overflow continuations.
    ///
    /// `awaiting` lists templates already waiting on a filler at the current
    /// position; meeting one of them again means the fillers can never reach
    /// an allowed position.
    fn compose_chain(
        &self,
        document: &mut ComposedDocument,
        page_data: &PageData,
        awaiting: &[&str],
    ) -> Result<Vec<SourceHandle>> {
        let mut handles = Vec::new();
        let mut current = Cow::Borrowed(page_data);
        let mut awaiting = awaiting;

        loop {
            let continuation = self.compose_single(document, &current, awaiting, &mut handles)?;
            awaiting = &[];
            match continuation {
                Some(next) => current = Cow::Owned(next),
                None => return Ok(handles),
            }
        }
    }

    /// Compose one page, pushing the handles it opens. Returns the
    /// continuation page when content overflowed into an overflow template.
    fn compose_single(
        &self,
        document: &mut ComposedDocument,
        page_data: &PageData,
        awaiting: &[&str],
        handles: &mut Vec<SourceHandle>,
    ) -> Result<Option<PageData>> {
        let registry = self.context.registry();
        let template = registry
            .lookup(&page_data.template)
            .ok_or_else(|| ComposeError::UnknownTemplate(page_data.template.clone()))?;

        let mut position = document.page_count() + 1;
        if let Some(restriction) = &template.page_restriction {
            if !restriction.rule.allows(position) {
                let Some(filler) = &restriction.filler_template else {
                    log::debug!(
                        "template '{}' not allowed at position {}, skipping",
                        template.name,
                        position
                    );
                    return Ok(None);
                };
                if awaiting.contains(&template.name.as_str()) {
                    return Err(ComposeError::FillerStalled(filler.clone()));
                }

                let mut chain = awaiting.to_vec();
                chain.push(&template.name);
                self.insert_fillers(document, page_data, restriction, filler, &chain, handles)?;
                position = document.page_count() + 1;
            }
        }

        if let Some(limit) = self.page_limit {
            if document.page_count() >= limit {
                return Err(ComposeError::PageLimitExceeded(limit));
            }
        }

        let parity = Parity::of(position);
        let handle = registry.open_source(&template.name, parity)?;
        let page_id = document.import_page(handle.source())?;
        handles.push(handle);
        log::debug!(
            "page {}: template '{}' ({:?})",
            position,
            template.name,
            parity
        );

        let mut canvas = Canvas::open(document, page_id);
        let overflow = self.fillers.fill_regions(
            document,
            &mut canvas,
            registry.regions_for_parity(&template.name, parity)?,
            &page_data.locations,
            self.context,
        )?;

        self.transforms.apply_all(
            document.page_mut(page_id)?,
            template.page_transforms.for_parity(parity),
        )?;
        canvas.close(document)?;

        if overflow.is_empty() {
            return Ok(None);
        }
        match &template.overflow_template {
            Some(next) => Ok(Some(page_data.continuation(next, overflow))),
            None => {
                log::debug!(
                    "template '{}' has no overflow template, dropping overflow of {:?}",
                    template.name,
                    overflow.keys().collect::<Vec<_>>()
                );
                Ok(None)
            }
        }
    }

    /// Compose filler pages until the restriction allows the next position.
    ///
    /// A parity rule gets exactly one filler. A predicate rule gets one filler
    /// per failing position; a filler that adds no page would never advance
    /// the position and is an error.
    fn insert_fillers(
        &self,
        document: &mut ComposedDocument,
        page_data: &PageData,
        restriction: &PageRestriction,
        filler: &str,
        awaiting: &[&str],
        handles: &mut Vec<SourceHandle>,
    ) -> Result<()> {
        let filler_page = page_data.filler(filler);
        loop {
            let before = document.page_count();
            handles.extend(self.compose_chain(document, &filler_page, awaiting)?);
            let added = document.page_count() - before;
            log::debug!("filler '{}' added {} page(s)", filler, added);

            match &restriction.rule {
                PositionRule::Parity(_) => {
                    if added == 0 {
                        log::warn!("filler '{}' added no page", filler);
                    }
                    return Ok(());
                }
                PositionRule::Predicate(predicate) => {
                    if added == 0 {
                        return Err(ComposeError::FillerStalled(filler.to_string()));
                    }
                    if predicate.test(document.page_count() + 1) {
                        return Ok(());
                    }
                }
            }
        }
    }
}

//! State of the "create object" form.
//!
//! Generic over the selected image so the browser client can keep a
//! `web_sys::File` here while tests use plain values.

use std::fmt;

pub const GENERIC_CREATE_ERROR: &str = "Failed to create the object";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError(pub Field);

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Field::Title => write!(f, "A title is required"),
            Field::Description => write!(f, "A description is required"),
            Field::Image => write!(f, "An image is required"),
        }
    }
}

/// Validated content of one submission, ready to become a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission<I> {
    pub title: String,
    pub description: String,
    pub image: I,
}

/// Emitted once per accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion<R> {
    pub created: R,
    pub released_preview: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum SubmitOutcome<I> {
    /// Another submission is still in flight; the attempt is discarded.
    Busy,
    Invalid(FieldError),
    Ready(Submission<I>),
}

#[derive(Debug, Clone)]
pub struct FormState<I> {
    pub title: String,
    pub description: String,
    image: Option<I>,
    preview: Option<String>,
    error: Option<String>,
    submitting: bool,
}

impl<I> Default for FormState<I> {
    fn default() -> Self {
        FormState {
            title: String::new(),
            description: String::new(),
            image: None,
            preview: None,
            error: None,
            submitting: false,
        }
    }
}

impl<I: Clone> FormState<I> {
    pub fn image(&self) -> Option<&I> {
        self.image.as_ref()
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Whether the submit button should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.submitting
            && !self.title.trim().is_empty()
            && !self.description.trim().is_empty()
            && self.image.is_some()
    }

    /// Stores the selected image. Returns the preview it replaces, if any,
    /// so the caller can release it.
    pub fn select_image(&mut self, image: I, preview: Option<String>) -> Option<String> {
        self.image = Some(image);
        std::mem::replace(&mut self.preview, preview)
    }

    /// Returns the released preview, if any.
    pub fn remove_image(&mut self) -> Option<String> {
        self.image = None;
        self.preview.take()
    }

    pub fn begin_submit(&mut self) -> SubmitOutcome<I> {
        if self.submitting {
            return SubmitOutcome::Busy;
        }

        match self.validate() {
            Ok(submission) => {
                self.error = None;
                self.submitting = true;
                SubmitOutcome::Ready(submission)
            }
            Err(err) => {
                self.error = Some(err.to_string());
                SubmitOutcome::Invalid(err)
            }
        }
    }

    /// Resets every field and hands back the completion to announce.
    /// `None` when no submission is in flight.
    pub fn finish_success<R>(&mut self, created: R) -> Option<Completion<R>> {
        if !self.submitting {
            return None;
        }
        let released_preview = self.preview.take();
        *self = FormState::default();
        Some(Completion {
            created,
            released_preview,
        })
    }

    /// Keeps the entered values so the user can retry.
    pub fn finish_failure(&mut self, message: Option<String>) {
        self.submitting = false;
        self.error = Some(
            message
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| GENERIC_CREATE_ERROR.to_string()),
        );
    }

    fn validate(&self) -> Result<Submission<I>, FieldError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FieldError(Field::Title));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(FieldError(Field::Description));
        }
        let image = self.image.clone().ok_or(FieldError(Field::Image))?;

        Ok(Submission {
            title: title.to_string(),
            description: description.to_string(),
            image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> FormState<&'static str> {
        let mut form = FormState::default();
        form.title = "  Lamp ".to_string();
        form.description = "Desk lamp".to_string();
        form.select_image("lamp.png", Some("blob:1".to_string()));
        form
    }

    #[test]
    fn missing_fields_are_reported_in_order() {
        let mut form = filled();
        form.title = "   ".to_string();
        assert_eq!(form.begin_submit(), SubmitOutcome::Invalid(FieldError(Field::Title)));
        assert_eq!(form.error(), Some("A title is required"));

        let mut form = filled();
        form.description.clear();
        assert_eq!(
            form.begin_submit(),
            SubmitOutcome::Invalid(FieldError(Field::Description))
        );
        assert_eq!(form.error(), Some("A description is required"));

        let mut form = filled();
        form.remove_image();
        assert_eq!(form.begin_submit(), SubmitOutcome::Invalid(FieldError(Field::Image)));
        assert_eq!(form.error(), Some("An image is required"));
        assert!(!form.is_submitting());
    }

    #[test]
    fn valid_form_yields_trimmed_submission() {
        let mut form = filled();

        let outcome = form.begin_submit();
        assert_eq!(
            outcome,
            SubmitOutcome::Ready(Submission {
                title: "Lamp".to_string(),
                description: "Desk lamp".to_string(),
                image: "lamp.png",
            })
        );
        assert!(form.is_submitting());
        assert!(!form.can_submit());
    }

    #[test]
    fn second_submit_while_busy_is_discarded() {
        let mut form = filled();
        form.begin_submit();

        assert_eq!(form.begin_submit(), SubmitOutcome::Busy);
    }

    #[test]
    fn success_resets_every_field() {
        let mut form = filled();
        form.begin_submit();

        let done = form.finish_success(7).unwrap();
        assert_eq!(done.released_preview, Some("blob:1".to_string()));
        assert!(form.title.is_empty());
        assert!(form.description.is_empty());
        assert!(form.image().is_none());
        assert!(form.preview().is_none());
        assert!(form.error().is_none());
        assert!(!form.is_submitting());
    }

    #[test]
    fn one_submission_completes_exactly_once() {
        let mut form = filled();
        assert!(matches!(form.begin_submit(), SubmitOutcome::Ready(_)));
        assert_eq!(form.begin_submit(), SubmitOutcome::Busy);

        let completions = vec![form.finish_success("lamp"), form.finish_success("lamp")]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        assert_eq!(
            completions,
            vec![Completion {
                created: "lamp",
                released_preview: Some("blob:1".to_string()),
            }]
        );
    }

    #[test]
    fn success_without_submission_is_ignored() {
        let mut form = filled();
        assert_eq!(form.finish_success(1), None);
        assert_eq!(form.title, "  Lamp ");
    }

    #[test]
    fn failure_keeps_fields_and_shows_message() {
        let mut form = filled();
        form.begin_submit();
        form.finish_failure(Some("Image too large".to_string()));

        assert_eq!(form.error(), Some("Image too large"));
        assert_eq!(form.title, "  Lamp ");
        assert_eq!(form.image(), Some(&"lamp.png"));
        assert!(form.can_submit());
    }

    #[test]
    fn failure_without_message_uses_fallback() {
        let mut form = filled();
        form.begin_submit();
        form.finish_failure(None);
        assert_eq!(form.error(), Some(GENERIC_CREATE_ERROR));

        form.begin_submit();
        form.finish_failure(Some("  ".to_string()));
        assert_eq!(form.error(), Some(GENERIC_CREATE_ERROR));
    }

    #[test]
    fn selecting_a_new_image_returns_old_preview() {
        let mut form = filled();
        let old = form.select_image("other.png", Some("blob:2".to_string()));

        assert_eq!(old, Some("blob:1".to_string()));
        assert_eq!(form.preview(), Some("blob:2"));
    }
}

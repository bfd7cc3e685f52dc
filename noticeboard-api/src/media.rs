//! Splitting a notice's files into carousel images and downloadable attachments
//!
//! A file is an image when any of these hold:
//! - its kind tag is `image`
//! - its url ends in a known image extension, optionally followed by a query string
//! - its MIME type starts with `image/`
//!
//! Files without a url are never images.

use serde::Serialize;

use crate::{
    browser::{wrap_next, wrap_prev},
    notices::{FileKind, Notice, NoticeFile},
};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg"];

/// An image to show in the carousel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub url: String,
    pub name: Option<String>,
}

/// A non-image file offered for download
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub url: Option<String>,
    /// Display name: the original file name, or `attachment-<n>.pdf`
    pub name: String,
    pub mime_type: Option<String>,
}

/// Images and attachments of one notice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Media {
    pub images: Vec<ImageRef>,
    pub attachments: Vec<Attachment>,
}

impl Media {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.attachments.is_empty()
    }
}

/// Returns true if the file carries any image signal.
pub fn is_image(file: &NoticeFile) -> bool {
    let Some(url) = file.url() else {
        return false;
    };
    file.kind == Some(FileKind::Image)
        || has_image_extension(url)
        || file
            .mime_type
            .as_deref()
            .is_some_and(|mime| mime.to_ascii_lowercase().starts_with("image/"))
}

/// Classifies the files of a notice.
///
/// A primary file tagged as an image leads the images, named after the notice title.
/// A primary file with any other tag leads the attachments.
/// Images with a url seen earlier are dropped.
pub fn classify(notice: &Notice) -> Media {
    let mut media = Media::default();
    let mut attachment_files: Vec<&NoticeFile> = Vec::new();

    if let Some(primary) = &notice.primary_file
        && let Some(url) = primary.url()
    {
        if primary.kind == Some(FileKind::Image) {
            push_image(&mut media.images, url, Some(notice.title.clone()));
        } else {
            attachment_files.push(primary);
        }
    }

    for file in &notice.files {
        match file.url() {
            Some(url) if is_image(file) => {
                push_image(&mut media.images, url, file.original_name.clone());
            }
            _ => attachment_files.push(file),
        }
    }

    media.attachments = attachment_files
        .into_iter()
        .enumerate()
        .map(|(idx, file)| Attachment {
            url: file.url().map(ToString::to_string),
            name: file
                .original_name
                .clone()
                .unwrap_or_else(|| format!("attachment-{}.pdf", idx + 1)),
            mime_type: file.mime_type.clone(),
        })
        .collect();
    media
}

fn push_image(images: &mut Vec<ImageRef>, url: &str, name: Option<String>) {
    if images.iter().any(|img| img.url == url) {
        return;
    }
    images.push(ImageRef {
        url: url.to_string(),
        name,
    });
}

// extension check on the path part; a trailing "?query" is allowed
fn has_image_extension(url: &str) -> bool {
    let path = url.split_once('?').map_or(url, |(path, _query)| path);
    path.rsplit_once('.').is_some_and(|(_, ext)| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

/// Position within a notice's images, wrapping at both ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Carousel {
    len: usize,
    index: usize,
}

impl Carousel {
    pub fn new(len: usize) -> Self {
        Self { len, index: 0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn previous(&mut self) {
        self.index = wrap_prev(self.index, self.len);
    }

    pub fn next(&mut self) {
        self.index = wrap_next(self.index, self.len);
    }

    /// (1-based position, total), or None when there are no images
    pub fn position(&self) -> Option<(usize, usize)> {
        (self.len > 0).then_some((self.index + 1, self.len))
    }

    /// The current image out of `images`
    pub fn current<'a>(&self, images: &'a [ImageRef]) -> Option<&'a ImageRef> {
        images.get(self.index)
    }
}

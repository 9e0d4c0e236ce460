//! Font module root.
//!
//! The scene renders one syllable from **vector glyph outlines**:
//! - Discover fonts (system fonts via `fontdb`, or an explicit font file).
//! - Resolve a requested family/weight/style to a concrete face.
//! - Record a character's outline callbacks (`ttf-parser`) as `OutlineCommand`s.
//! - Compile commands into a `CompoundShape` (`outline`), fit/flip it (`transform`),
//!   and tessellate it for the GPU (`tessellate`).
//!
//! The rest of the crate only sees the `OutlineSource` trait, so tests (and other
//! loaders) can feed commands without touching font files.

pub mod outline;
pub mod tessellate;
pub mod transform;

use std::{fs, path::Path, sync::Arc};

use fontdb::{Database, Family, ID, Query, Source, Style, Weight};
use log::debug;
use lyon::math::point;

use crate::font::outline::OutlineCommand;

/// Anything that can produce the outline of a single character.
///
/// Failures are returned as-is; retry policy belongs to the caller.
pub trait OutlineSource {
    fn outline(&self, ch: char) -> Result<Vec<OutlineCommand>, FontError>;
}

/// A stable identifier for a selected font face within our font system.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontFaceId(pub ID);

/// Simplified font style selection.
#[derive(Debug, Clone, Default)]
pub struct FontQuery {
    /// Preferred font family names, in priority order.
    pub families: Vec<String>,

    /// Weight in CSS-ish terms (100..900).
    pub weight: u16,

    /// Italic / oblique.
    pub italic: bool,
}

impl FontQuery {
    /// Families likely to carry Hangul syllables on common systems, heaviest first.
    pub fn hangul() -> Self {
        Self {
            families: vec![
                "Black Han Sans".to_string(),
                "Noto Sans CJK KR".to_string(),
                "Noto Sans KR".to_string(),
                "NanumGothic".to_string(),
                "Apple SD Gothic Neo".to_string(),
                "Malgun Gothic".to_string(),
                "sans-serif".to_string(),
            ],
            weight: 900,
            italic: false,
        }
    }
}

/// A resolved face plus its bytes.
///
/// - `bytes` contains the full font file/collection.
/// - `index` selects the face within the collection.
#[derive(Debug, Clone)]
pub struct ResolvedFace {
    pub face_id: FontFaceId,
    pub bytes: Arc<[u8]>,
    pub index: u32,
    pub units_per_em: f32,
}

/// Errors produced by the font subsystem.
#[derive(thiserror::Error, Debug)]
pub enum FontError {
    #[error("no fonts found on this system")]
    NoFontsAvailable,

    #[error("failed to resolve a font face for query: {0:?}")]
    ResolveFailed(FontQuery),

    #[error("font face has no file-backed source")]
    NonFileBackedSource,

    #[error("failed to read font file from disk: {0}")]
    ReadFailed(String),

    #[error("failed to parse font face")]
    ParseFailed,

    #[error("no glyph outline for {ch:?}")]
    MissingGlyph { ch: char },

    #[error("other: {0}")]
    Other(String),
}

/// Owns a `fontdb::Database` and turns queries or files into `ResolvedFace`s.
pub struct FontSystem {
    db: Database,
}

impl FontSystem {
    /// Create a font system backed by the system fonts.
    pub fn new() -> Result<Self, FontError> {
        let mut db = Database::new();
        db.load_system_fonts();

        if db.faces().next().is_none() {
            return Err(FontError::NoFontsAvailable);
        }

        Ok(Self { db })
    }

    /// Create an empty font system (no system fonts); use `load_file` to populate it.
    pub fn empty() -> Self {
        Self {
            db: Database::new(),
        }
    }

    /// Load a font file and resolve its first face.
    pub fn load_file(&mut self, path: &Path) -> Result<ResolvedFace, FontError> {
        let before: Vec<ID> = self.db.faces().map(|f| f.id).collect();
        self.db
            .load_font_file(path)
            .map_err(|_| FontError::ReadFailed(path.display().to_string()))?;

        let id = self
            .db
            .faces()
            .map(|f| f.id)
            .find(|id| !before.contains(id))
            .ok_or_else(|| FontError::ReadFailed(path.display().to_string()))?;

        self.face(id)
    }

    /// Resolve a `FontQuery` to a concrete face.
    ///
    /// - Try each named family in order with the requested weight/style.
    /// - Fall back to `sans-serif`.
    /// - If still not found, fall back to the first face in the database.
    pub fn resolve(&self, query: &FontQuery) -> Result<ResolvedFace, FontError> {
        if self.db.faces().next().is_none() {
            return Err(FontError::NoFontsAvailable);
        }

        let style = if query.italic {
            Style::Italic
        } else {
            Style::Normal
        };
        let weight = Weight(query.weight.clamp(1, 1000));

        let mut families: Vec<Family<'_>> = Vec::new();
        for f in &query.families {
            let s = f.trim();
            if s.eq_ignore_ascii_case("serif") {
                families.push(Family::Serif);
            } else if s.eq_ignore_ascii_case("sans-serif") || s.eq_ignore_ascii_case("sans") {
                families.push(Family::SansSerif);
            } else if !s.is_empty() {
                families.push(Family::Name(s));
            }
        }

        let id = self
            .db
            .query(&Query {
                families: &families,
                weight,
                style,
                stretch: fontdb::Stretch::Normal,
            })
            .or_else(|| {
                self.db.query(&Query {
                    families: &[Family::SansSerif],
                    weight,
                    style,
                    stretch: fontdb::Stretch::Normal,
                })
            })
            .or_else(|| self.db.faces().next().map(|f| f.id))
            .ok_or_else(|| FontError::ResolveFailed(query.clone()))?;

        self.face(id)
    }

    fn face(&self, id: ID) -> Result<ResolvedFace, FontError> {
        let face = self.db.face(id).ok_or(FontError::NoFontsAvailable)?;

        let (path, index) = match &face.source {
            Source::File(p) => (p.to_path_buf(), face.index),
            _ => return Err(FontError::NonFileBackedSource),
        };
        debug!("resolved font face {:?} from {}", face.families, path.display());

        let bytes = read_font_bytes(&path)?;
        let parsed = ttf_parser::Face::parse(&bytes, index).map_err(|_| FontError::ParseFailed)?;

        Ok(ResolvedFace {
            face_id: FontFaceId(id),
            units_per_em: parsed.units_per_em() as f32,
            bytes,
            index,
        })
    }
}

fn read_font_bytes(path: &Path) -> Result<Arc<[u8]>, FontError> {
    let data = fs::read(path).map_err(|_| FontError::ReadFailed(path.display().to_string()))?;
    Ok(Arc::<[u8]>::from(data))
}

/// `OutlineSource` backed by a parsed font face.
#[derive(Debug, Clone)]
pub struct FaceOutlines {
    face: ResolvedFace,
}

impl FaceOutlines {
    pub fn new(face: ResolvedFace) -> Self {
        Self { face }
    }

    pub fn face(&self) -> &ResolvedFace {
        &self.face
    }
}

impl OutlineSource for FaceOutlines {
    fn outline(&self, ch: char) -> Result<Vec<OutlineCommand>, FontError> {
        let parsed = ttf_parser::Face::parse(&self.face.bytes, self.face.index)
            .map_err(|_| FontError::ParseFailed)?;
        let gid = parsed
            .glyph_index(ch)
            .ok_or(FontError::MissingGlyph { ch })?;

        let mut recorder = CommandRecorder::default();
        // `None` means "no outline" (e.g. a space).
        parsed
            .outline_glyph(gid, &mut recorder)
            .ok_or(FontError::MissingGlyph { ch })?;

        Ok(recorder.commands)
    }
}

/// Records `ttf-parser` outline callbacks verbatim, in font units (Y-up).
#[derive(Debug, Default)]
struct CommandRecorder {
    commands: Vec<OutlineCommand>,
}

impl ttf_parser::OutlineBuilder for CommandRecorder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(OutlineCommand::MoveTo(point(x, y)));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(OutlineCommand::LineTo(point(x, y)));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.commands.push(OutlineCommand::QuadraticCurveTo {
            ctrl: point(x1, y1),
            to: point(x, y),
        });
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.commands.push(OutlineCommand::CubicCurveTo {
            ctrl1: point(x1, y1),
            ctrl2: point(x2, y2),
            to: point(x, y),
        });
    }

    fn close(&mut self) {
        self.commands.push(OutlineCommand::ClosePath);
    }
}

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use super::{DocumentRenderer, RenderError, RenderedDocument};
use crate::layout::{Border, Color, DrawInstruction, FontWeight, PageSize};

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";

/// Single-page PDF output using the standard Helvetica faces
pub struct PdfRenderer {
    regular: &'static str,
    bold: &'static str,
}

impl PdfRenderer {
    pub fn new() -> Self {
        Self {
            regular: "Helvetica",
            bold: "Helvetica-Bold",
        }
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, page: PageSize, instructions: &[DrawInstruction]) -> Result<RenderedDocument, RenderError> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(font_dictionary(self.regular));
        let bold_id = doc.add_object(font_dictionary(self.bold));
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                REGULAR_FONT => regular_id,
                BOLD_FONT => bold_id,
            },
        });

        let content: Content<Vec<Operation>> = Content {
            operations: instructions.iter().flat_map(operations).collect(),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.0_f32.into(), 0.0_f32.into(), page.width.into(), page.height.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1_i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;

        Ok(RenderedDocument {
            bytes,
            content_type: mime::APPLICATION_PDF,
        })
    }
}

fn font_dictionary(base_font: &str) -> Object {
    Object::Dictionary(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    })
}

fn color_operands(color: Color) -> Vec<Object> {
    vec![color.r.into(), color.g.into(), color.b.into()]
}

/// Content-stream operators painting one instruction
fn operations(instruction: &DrawInstruction) -> Vec<Operation> {
    match instruction {
        DrawInstruction::Text {
            text,
            x,
            y,
            size,
            font,
            color,
        } => {
            let font_name = match font {
                FontWeight::Regular => REGULAR_FONT,
                FontWeight::Bold => BOLD_FONT,
            };
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![font_name.into(), (*size).into()]),
                Operation::new("rg", color_operands(*color)),
                Operation::new("Td", vec![(*x).into(), (*y).into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]
        }
        DrawInstruction::Line {
            start,
            end,
            thickness,
            color,
        } => vec![
            Operation::new("q", vec![]),
            Operation::new("RG", color_operands(*color)),
            Operation::new("w", vec![(*thickness).into()]),
            Operation::new("m", vec![start.0.into(), start.1.into()]),
            Operation::new("l", vec![end.0.into(), end.1.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ],
        DrawInstruction::Rect {
            x,
            y,
            width,
            height,
            fill,
            border,
        } => {
            let mut ops = vec![
                Operation::new("q", vec![]),
                Operation::new("rg", color_operands(*fill)),
            ];
            if let Some(Border { color, width: line_width }) = border {
                ops.push(Operation::new("RG", color_operands(*color)));
                ops.push(Operation::new("w", vec![(*line_width).into()]));
            }
            ops.push(Operation::new(
                "re",
                vec![(*x).into(), (*y).into(), (*width).into(), (*height).into()],
            ));
            // fill and stroke, or fill only
            ops.push(Operation::new(if border.is_some() { "B" } else { "f" }, vec![]));
            ops.push(Operation::new("Q", vec![]));
            ops
        }
    }
}

/// Encode text for a WinAnsi standard font; unmappable characters become `?`
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '€' => 0x80,
            '–' => 0x96,
            '—' => 0x97,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            _ => b'?',
        })
        .collect()
}

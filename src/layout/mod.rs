//! Deterministic layout of an invoice onto a single A4 page.
//!
//! [`layout`] turns an [`Invoice`] into an ordered list of absolutely positioned
//! [`DrawInstruction`]s. Coordinates are in points with the origin at the
//! bottom-left corner. Every region sits at a fixed offset from the top of the
//! page, pushed down only by the number of lines in the text above it. There is
//! no reflow and no page break; content that runs past the bottom edge is
//! simply off the page.

pub mod format;

use crate::models::Invoice;
use format::{format_date, format_money, format_quantity};

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

const MARGIN: f32 = 50.0;
const TITLE_SIZE: f32 = 24.0;
const HEADER_SIZE: f32 = 12.0;
const NORMAL_SIZE: f32 = 10.0;
const LINE_HEIGHT: f32 = 15.0;
const ROW_HEIGHT: f32 = 25.0;

// Distances from the top edge of the page
const TITLE_TOP: f32 = 50.0;
const COMPANY_NAME_TOP: f32 = 90.0;
const COMPANY_ADDRESS_TOP: f32 = 110.0;
const METADATA_LINE_TOPS: [f32; 3] = [90.0, 105.0, 120.0];
const SEPARATOR_TOP: f32 = 150.0;
const BILL_TO_TOP: f32 = 180.0;
const CLIENT_NAME_TOP: f32 = 200.0;
const CLIENT_ADDRESS_TOP: f32 = 215.0;
const TABLE_TOP: f32 = 280.0;

/// Metadata block starts this far left of the right page edge
const METADATA_RIGHT_OFFSET: f32 = 200.0;
/// Description, quantity, unit price, amount
const COLUMN_WIDTHS: [f32; 4] = [300.0, 80.0, 80.0, 80.0];
const CELL_PADDING: f32 = 10.0;

const FOOTER_TEXT: &str = "Thank you for your business!";
const FOOTER_BASELINE: f32 = 50.0;
const FOOTER_HALF_WIDTH: f32 = 80.0;

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

pub const A4: PageSize = PageSize {
    width: PAGE_WIDTH,
    height: PAGE_HEIGHT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// RGB color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::gray(0.0);

    pub const fn gray(level: f32) -> Self {
        Self {
            r: level,
            g: level,
            b: level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub color: Color,
    pub width: f32,
}

/// A single primitive to paint, in page coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum DrawInstruction {
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        font: FontWeight,
        color: Color,
    },
    Line {
        start: (f32, f32),
        end: (f32, f32),
        thickness: f32,
        color: Color,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Color,
        border: Option<Border>,
    },
}

/// Accumulates instructions in paint order
struct Canvas {
    page: PageSize,
    ops: Vec<DrawInstruction>,
}

impl Canvas {
    fn new(page: PageSize) -> Self {
        Self {
            page,
            ops: Vec::new(),
        }
    }

    /// Baseline `offset` points below the top edge
    fn from_top(&self, offset: f32) -> f32 {
        self.page.height - offset
    }

    fn text(&mut self, text: impl Into<String>, x: f32, y: f32, size: f32, font: FontWeight, color: Color) {
        self.ops.push(DrawInstruction::Text {
            text: text.into(),
            x,
            y,
            size,
            font,
            color,
        });
    }

    fn line(&mut self, start: (f32, f32), end: (f32, f32), thickness: f32, color: Color) {
        self.ops.push(DrawInstruction::Line {
            start,
            end,
            thickness,
            color,
        });
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: Color, border: Option<Border>) {
        self.ops.push(DrawInstruction::Rect {
            x,
            y,
            width,
            height,
            fill,
            border,
        });
    }
}

/// Split multi-line user text into display lines; an empty string is one empty line
fn text_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Lay the invoice out on one A4 page
pub fn layout(invoice: &Invoice) -> Vec<DrawInstruction> {
    let mut canvas = Canvas::new(A4);
    let width = canvas.page.width;

    canvas.text(
        "INVOICE",
        MARGIN,
        canvas.from_top(TITLE_TOP),
        TITLE_SIZE,
        FontWeight::Bold,
        Color::gray(0.2),
    );

    // Company block grows with its address
    canvas.text(
        &invoice.company_name,
        MARGIN,
        canvas.from_top(COMPANY_NAME_TOP),
        HEADER_SIZE,
        FontWeight::Bold,
        Color::BLACK,
    );
    let company_address = text_lines(&invoice.company_address);
    for (index, line) in company_address.iter().enumerate() {
        let y = canvas.from_top(COMPANY_ADDRESS_TOP + index as f32 * LINE_HEIGHT);
        canvas.text(*line, MARGIN, y, NORMAL_SIZE, FontWeight::Regular, Color::BLACK);
    }
    let after_address = COMPANY_ADDRESS_TOP + company_address.len() as f32 * LINE_HEIGHT;
    canvas.text(
        format!("Email: {}", invoice.company_email),
        MARGIN,
        canvas.from_top(after_address),
        NORMAL_SIZE,
        FontWeight::Regular,
        Color::BLACK,
    );
    canvas.text(
        format!("Phone: {}", invoice.company_phone),
        MARGIN,
        canvas.from_top(after_address + LINE_HEIGHT),
        NORMAL_SIZE,
        FontWeight::Regular,
        Color::BLACK,
    );

    let metadata = [
        format!("Invoice #: {}", invoice.invoice_number),
        format!("Date: {}", format_date(invoice.invoice_date)),
        format!("Due Date: {}", format_date(invoice.due_date)),
    ];
    for (text, top) in metadata.into_iter().zip(METADATA_LINE_TOPS) {
        canvas.text(
            text,
            width - METADATA_RIGHT_OFFSET,
            canvas.from_top(top),
            NORMAL_SIZE,
            FontWeight::Regular,
            Color::BLACK,
        );
    }

    let separator_y = canvas.from_top(SEPARATOR_TOP);
    canvas.line(
        (MARGIN, separator_y),
        (width - MARGIN, separator_y),
        2.0,
        Color::gray(0.8),
    );

    // Bill-to block, same growth rule as the company block
    canvas.text(
        "BILL TO:",
        MARGIN,
        canvas.from_top(BILL_TO_TOP),
        HEADER_SIZE,
        FontWeight::Bold,
        Color::gray(0.4),
    );
    canvas.text(
        &invoice.client_name,
        MARGIN,
        canvas.from_top(CLIENT_NAME_TOP),
        NORMAL_SIZE,
        FontWeight::Bold,
        Color::BLACK,
    );
    let client_address = text_lines(&invoice.client_address);
    for (index, line) in client_address.iter().enumerate() {
        let y = canvas.from_top(CLIENT_ADDRESS_TOP + index as f32 * LINE_HEIGHT);
        canvas.text(*line, MARGIN, y, NORMAL_SIZE, FontWeight::Regular, Color::BLACK);
    }
    canvas.text(
        format!("Email: {}", invoice.client_email),
        MARGIN,
        canvas.from_top(CLIENT_ADDRESS_TOP + client_address.len() as f32 * LINE_HEIGHT),
        NORMAL_SIZE,
        FontWeight::Regular,
        Color::BLACK,
    );

    let table_top = canvas.from_top(TABLE_TOP);
    let table_left = MARGIN;
    let table_width = (width - MARGIN) - table_left;
    let columns = column_offsets(table_left);

    canvas.rect(
        table_left,
        table_top - ROW_HEIGHT,
        table_width,
        ROW_HEIGHT,
        Color::gray(0.9),
        Some(Border {
            color: Color::gray(0.8),
            width: 1.0,
        }),
    );
    let headers = ["Description", "Quantity", "Unit Price", "Amount"];
    for (index, (label, x)) in headers.into_iter().zip(columns).enumerate() {
        let x = if index == 0 { x + CELL_PADDING } else { x };
        canvas.text(label, x, table_top - 15.0, HEADER_SIZE, FontWeight::Bold, Color::gray(0.2));
    }

    let mut y = table_top - 40.0;
    let mut total = 0.0;
    for (index, item) in invoice.line_items.iter().enumerate() {
        let amount = item.amount();
        total += amount;

        if index % 2 == 0 {
            canvas.rect(table_left, y - 15.0, table_width, ROW_HEIGHT, Color::gray(0.97), None);
        }

        let cells = [
            item.description.clone(),
            format_quantity(item.quantity),
            format_money(item.unit_price),
            format_money(amount),
        ];
        for (column, (text, x)) in cells.into_iter().zip(columns).enumerate() {
            let x = if column == 0 { x + CELL_PADDING } else { x };
            canvas.text(text, x, y, NORMAL_SIZE, FontWeight::Regular, Color::BLACK);
        }

        y -= ROW_HEIGHT;
    }

    // Totals band spans the three numeric columns
    canvas.rect(
        columns[1],
        y - 15.0,
        table_width - COLUMN_WIDTHS[0],
        30.0,
        Color::gray(0.95),
        Some(Border {
            color: Color::gray(0.9),
            width: 1.0,
        }),
    );
    canvas.text("Total:", columns[1] + CELL_PADDING, y, HEADER_SIZE, FontWeight::Bold, Color::BLACK);
    canvas.text(format_money(total), columns[3], y, HEADER_SIZE, FontWeight::Bold, Color::gray(0.2));

    if let Some(notes) = invoice.notes() {
        let lines = text_lines(notes);
        let block_height = lines.len() as f32 * LINE_HEIGHT;

        canvas.text("NOTES:", table_left, y - 50.0, HEADER_SIZE, FontWeight::Bold, Color::gray(0.4));
        canvas.rect(
            table_left,
            y - 70.0 - block_height,
            table_width,
            block_height + 20.0,
            Color::gray(0.97),
            Some(Border {
                color: Color::gray(0.95),
                width: 1.0,
            }),
        );
        for (index, line) in lines.into_iter().enumerate() {
            let line_y = y - 70.0 - index as f32 * LINE_HEIGHT;
            canvas.text(line, table_left + CELL_PADDING, line_y, NORMAL_SIZE, FontWeight::Regular, Color::BLACK);
        }
    }

    canvas.text(
        FOOTER_TEXT,
        width / 2.0 - FOOTER_HALF_WIDTH,
        FOOTER_BASELINE,
        NORMAL_SIZE,
        FontWeight::Regular,
        Color::gray(0.4),
    );

    canvas.ops
}

/// Left edge of each table column
fn column_offsets(table_left: f32) -> [f32; 4] {
    let mut offsets = [table_left; 4];
    for index in 1..offsets.len() {
        offsets[index] = offsets[index - 1] + COLUMN_WIDTHS[index - 1];
    }
    offsets
}

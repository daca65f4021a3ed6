//! In-memory PDF builders for tests and benchmarks.
//!
//! Available to this crate's unit tests and, through the `test-utils`
//! feature, to integration tests and downstream crates.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

/// Letter size in points.
pub const LETTER: (f32, f32) = (612.0, 792.0);

#[derive(Debug, Clone, Copy)]
struct PageSpec {
    width: f32,
    height: f32,
    rotate: i64,
    broken: bool,
}

impl PageSpec {
    fn sized(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            rotate: 0,
            broken: false,
        }
    }
}

/// Content stream of page `number` as produced by every builder here.
///
/// A gray block and a text run labelled with the page number, so each
/// page's content is distinct and renders visibly at any size.
pub fn page_content(number: usize) -> Vec<u8> {
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("g", vec![Object::Real(0.2)]),
            Operation::new(
                "re",
                vec![10.into(), 10.into(), 40.into(), (10 + number as i64).into()],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![10.into(), 40.into()]),
            Operation::new("Tj", vec![Object::string_literal(format!("Page {number}"))]),
            Operation::new("ET", vec![]),
        ],
    };
    content.encode().expect("content encodes")
}

/// A Letter-size document with `pages` pages (zero allowed).
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    build(&vec![PageSpec::sized(LETTER.0, LETTER.1); pages], None)
}

/// A document with one page per `(width, height)` entry.
pub fn sized_pdf(sizes: &[(f32, f32)]) -> Vec<u8> {
    let specs: Vec<PageSpec> = sizes.iter().map(|&(w, h)| PageSpec::sized(w, h)).collect();
    build(&specs, None)
}

/// A single-page document with an intrinsic `/Rotate`.
pub fn rotated_pdf(width: f32, height: f32, rotate: i64) -> Vec<u8> {
    build(
        &[PageSpec {
            rotate,
            ..PageSpec::sized(width, height)
        }],
        None,
    )
}

/// A parsable document whose page `broken` (1-based) references a missing
/// content stream.
pub fn pdf_with_broken_page(pages: usize, broken: usize) -> Vec<u8> {
    let specs: Vec<PageSpec> = (1..=pages)
        .map(|number| PageSpec {
            broken: number == broken,
            ..PageSpec::sized(LETTER.0, LETTER.1)
        })
        .collect();
    build(&specs, None)
}

/// A document whose trailer declares an encryption dictionary.
pub fn encrypted_pdf() -> Vec<u8> {
    let encrypt = dictionary! {
        "Filter" => "Custom",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0u8; 32]),
        "U" => Object::string_literal(vec![0u8; 32]),
        "P" => -4,
    };
    build(&[PageSpec::sized(LETTER.0, LETTER.1)], Some(encrypt))
}

/// Bytes that are not a PDF at all.
pub fn garbage_bytes() -> Vec<u8> {
    b"this is definitely not a pdf document\n".repeat(8)
}

/// Bytes with a PDF header but no usable body.
pub fn corrupt_pdf() -> Vec<u8> {
    let mut bytes = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec();
    bytes.extend_from_slice(&garbage_bytes());
    bytes
}

fn build(pages: &[PageSpec], encrypt: Option<Dictionary>) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::with_capacity(pages.len());
    for (index, fixture) in pages.iter().enumerate() {
        let contents = if fixture.broken {
            // reserve an id that never receives an object
            doc.new_object_id()
        } else {
            doc.add_object(Stream::new(dictionary! {}, page_content(index + 1)))
        };

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(fixture.width),
                Object::Real(fixture.height),
            ],
            "Contents" => contents,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        };
        if fixture.rotate != 0 {
            page.set("Rotate", fixture.rotate);
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => pages.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    if let Some(encrypt) = encrypt {
        doc.trailer.set("Encrypt", encrypt);
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("in-memory save succeeds");
    bytes
}

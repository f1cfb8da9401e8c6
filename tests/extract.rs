use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use pdf_stream_strings::{PdfExtractor, PdfParser, Reference, from_bytes};

/// Assembles a file from numbered objects. A stream body gets its `Length`
/// filled in after the given dictionary entries.
struct PdfBuilder {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn new() -> Self {
        PdfBuilder {
            data: b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec(),
        }
    }

    fn object(mut self, index: i32, body: &str) -> Self {
        write!(self.data, "{} 0 obj\n{}\nendobj\n", index, body).unwrap();
        self
    }

    fn stream(mut self, index: i32, entries: &str, content: &[u8]) -> Self {
        write!(
            self.data,
            "{} 0 obj\n<< {} /Length {} >>\nstream\n",
            index,
            entries,
            content.len()
        )
        .unwrap();
        self.data.extend_from_slice(content);
        self.data.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    fn finish(mut self, trailer: &str) -> Vec<u8> {
        write!(self.data, "trailer\n{}\nstartxref\n0\n%%EOF\n", trailer).unwrap();
        self.data
    }
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

const CATALOG: &str = "<< /Type /Catalog /Pages 2 0 R >>";
const ONE_PAGE: &str = "<< /Type /Pages /Kids [3 0 R] /Count 1 >>";
const PAGE: &str =
    "<< /Type /Page /Parent 2 0 R /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>";
const WIN_ANSI_FONT: &str =
    "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>";

fn single_page(content: &[u8], font: &str) -> Vec<u8> {
    PdfBuilder::new()
        .object(1, CATALOG)
        .object(2, ONE_PAGE)
        .object(3, PAGE)
        .stream(4, "", content)
        .object(5, font)
        .finish("<< /Root 1 0 R >>")
}

#[test_log::test]
fn win_ansi_text() {
    let pdf = single_page(b"BT /F1 12 Tf (Caf\\351 cr\\350me) Tj ET", WIN_ANSI_FONT);
    let output = from_bytes(&pdf);
    assert!(output.is_complete(), "{:?}", output.error());
    assert_eq!(output.texts(), ["Caf\u{e9} cr\u{e8}me"]);
}

#[test_log::test]
fn wide_tj_adjustment_inserts_a_space() {
    let pdf = single_page(
        b"BT /F1 12 Tf [(Hello) -200 (World)] TJ 0 -14 Td [(Hello) -50 (World)] TJ ET",
        WIN_ANSI_FONT,
    );
    let output = from_bytes(&pdf);
    assert_eq!(output.texts(), ["Hello World", "HelloWorld"]);
}

#[test_log::test]
fn hyphenated_line_break_is_joined() {
    let pdf = single_page(
        b"BT /F1 12 Tf (stream-) Tj T* (ing) ' (text) Tj ET",
        WIN_ANSI_FONT,
    );
    let output = from_bytes(&pdf);
    assert_eq!(output.texts(), ["streaming", "text"]);
}

#[test_log::test]
fn to_unicode_cmap() {
    let cmap = b"/CIDInit /ProcSet findresource begin\n\
        12 dict begin\nbegincmap\n\
        /CMapName /Custom def\n\
        1 begincodespacerange <0000> <FFFF> endcodespacerange\n\
        1 beginbfchar <0003> <0020> endbfchar\n\
        1 beginbfrange <0010> <0012> <0041> endbfrange\n\
        endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend";
    let pdf = PdfBuilder::new()
        .object(1, CATALOG)
        .object(2, ONE_PAGE)
        .object(3, PAGE)
        .stream(4, "", b"BT /F1 12 Tf <001000110003 0012> Tj ET")
        .object(
            5,
            "<< /Type /Font /Subtype /Type0 /BaseFont /Custom /Encoding /Identity-H /ToUnicode 6 0 R >>",
        )
        .stream(6, "", cmap)
        .finish("<< /Root 1 0 R >>");
    let output = from_bytes(&pdf);
    assert!(output.is_complete(), "{:?}", output.error());
    assert_eq!(output.texts(), ["AB C"]);
}

#[test_log::test]
fn differences_override_base_encoding() {
    let pdf = PdfBuilder::new()
        .object(1, CATALOG)
        .object(2, ONE_PAGE)
        .object(3, PAGE)
        .stream(4, "", b"BT /F1 12 Tf (AB\\200) Tj ET")
        .object(5, "<< /Type /Font /Subtype /Type1 /Encoding 6 0 R >>")
        .object(
            6,
            "<< /Type /Encoding /BaseEncoding /WinAnsiEncoding /Differences [65 /B /A 128 /fi] >>",
        )
        .finish("<< /Root 1 0 R >>");
    let output = from_bytes(&pdf);
    // the ligature is expanded
    assert_eq!(output.texts(), ["BAfi"]);
}

#[test_log::test]
fn pages_are_committed_in_discovery_order() {
    let pdf = PdfBuilder::new()
        .object(1, CATALOG)
        .object(2, "<< /Type /Pages /Kids [3 0 R 7 0 R] /Count 2 >>")
        .object(3, PAGE)
        .stream(4, "", b"BT /F1 12 Tf (one) Tj ET")
        .object(
            7,
            "<< /Type /Page /Parent 2 0 R /Resources << /Font << /F2 9 0 R >> >> /Contents 8 0 R >>",
        )
        .stream(8, "", b"BT /F2 12 Tf (two) Tj ET")
        .object(9, WIN_ANSI_FONT)
        .object(5, "<< /Type /Font /Subtype /Type1 /Encoding << /Differences [111 /O] >> >>")
        .finish("<< /Root 1 0 R >>");
    let output = PdfExtractor::builder()
        .check_interval(1)
        .build()
        .from_bytes(&pdf);
    assert_eq!(output.texts(), ["One", "two"]);
}

fn late_font_document() -> Vec<u8> {
    PdfBuilder::new()
        .object(1, CATALOG)
        .object(2, ONE_PAGE)
        .stream(4, "", b"BT /F1 12 Tf (A) Tj ET")
        .object(3, PAGE)
        .object(5, "<< /Type /Font /Subtype /Type1 /Encoding << /Differences [65 /B] >> >>")
        .finish("<< /Root 1 0 R >>")
}

#[test_log::test]
fn waiting_page_uses_font_that_arrives_later() {
    let output = from_bytes(&late_font_document());
    assert_eq!(output.texts(), ["B"]);
}

#[test_log::test]
fn memory_limit_forces_fallback_decoding() {
    let output = PdfExtractor::builder()
        .memory_limit(0)
        .check_interval(1)
        .build()
        .from_bytes(&late_font_document());
    assert_eq!(output.texts(), ["A"]);
}

#[test_log::test]
fn missing_font_falls_back_at_end_of_file() {
    let pdf = PdfBuilder::new()
        .object(1, CATALOG)
        .object(2, ONE_PAGE)
        .object(3, PAGE)
        .stream(4, "", b"BT /F1 12 Tf (plain) Tj ET")
        .finish("<< /Root 1 0 R >>");
    let output = from_bytes(&pdf);
    assert_eq!(output.texts(), ["plain"]);
}

#[test_log::test]
fn compressed_object_stream_holds_the_font() {
    let packed = b"5 0 6 60\n<< /Type /Font /Subtype /Type1 /Encoding /WinAnsiEncoding >>\n<< /Font << /F1 5 0 R >> >>";
    let pdf = PdfBuilder::new()
        .object(1, CATALOG)
        .object(2, ONE_PAGE)
        .object(3, "<< /Type /Page /Parent 2 0 R /Resources 6 0 R /Contents 4 0 R >>")
        .stream(
            4,
            "/Filter /FlateDecode",
            &deflate(b"BT /F1 12 Tf (\\253quoted\\273) Tj ET"),
        )
        .stream(
            7,
            "/Type /ObjStm /N 2 /First 9 /Filter /FlateDecode",
            &deflate(packed),
        )
        .finish("<< /Root 1 0 R /Size 8 >>");
    let output = from_bytes(&pdf);
    assert!(output.is_complete(), "{:?}", output.error());
    assert_eq!(output.texts(), ["\u{ab}quoted\u{bb}"]);
}

#[test_log::test]
fn lopdf_written_document() {
    use lopdf::{Object, Stream, dictionary};

    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let content = deflate(b"BT /F1 24 Tf 72 720 Td (Written by lopdf) Tj ET");
    let content_id = doc.add_object(Stream::new(
        dictionary! { "Filter" => "FlateDecode" },
        content,
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "Contents" => Object::Reference(content_id),
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Streaming"),
        "CreationDate" => Object::string_literal("D:20240229081500-03'30"),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.trailer.set("Info", Object::Reference(info_id));

    let mut pdf = Vec::new();
    doc.save_to(&mut pdf).unwrap();

    let output = from_bytes(&pdf);
    assert!(output.is_complete(), "{:?}", output.error());
    assert_eq!(output.texts(), ["Written by lopdf"]);
    assert_eq!(output.metadata().title(), Some("Streaming"));
    assert_eq!(
        output.metadata().creation_date().as_deref(),
        Some("2024-02-29T08:15:00-03:30")
    );
}

#[test_log::test]
fn metadata_from_info_dictionary() {
    let pdf = PdfBuilder::new()
        .object(1, CATALOG)
        .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
        .object(
            9,
            "<< /Title <FEFF00C900740065> /Author (A. N. Other) /Keywords (pdf text) \
             /ModDate (D:20111125) /Trapped /False >>",
        )
        .finish("<< /Root 1 0 R /Info 9 0 R >>");
    let output = from_bytes(&pdf);
    assert!(output.texts().is_empty());
    let metadata = output.metadata();
    assert_eq!(metadata.title(), Some("\u{c9}te"));
    assert_eq!(metadata.author(), Some("A. N. Other"));
    assert_eq!(metadata.keywords(), vec!["pdf", "text"]);
    assert_eq!(
        metadata.modification_date().as_deref(),
        Some("2011-11-25T00:00:00")
    );
    assert_eq!(metadata.get("Trapped"), None);
}

#[test_log::test]
fn excessive_nesting_is_an_error() {
    let mut body = "[".repeat(1001);
    body.push_str(&"]".repeat(1001));
    let pdf = PdfBuilder::new()
        .object(1, CATALOG)
        .object(2, ONE_PAGE)
        .object(3, PAGE)
        .stream(4, "", b"BT /F1 12 Tf (kept) Tj ET")
        .object(5, WIN_ANSI_FONT)
        .object(6, &body)
        .finish("<< /Root 1 0 R >>");
    let output = from_bytes(&pdf);
    assert!(!output.is_complete());
    assert!(output.error().is_some_and(|e| e.contains("nest")), "{:?}", output.error());
    // text read before the error is still delivered
    assert_eq!(output.texts(), ["kept"]);
}

#[test_log::test]
fn truncated_file_keeps_earlier_text() {
    let pdf = single_page(b"BT /F1 12 Tf (early) Tj ET", WIN_ANSI_FONT);
    let cut = pdf.windows(7).position(|w| w == b"trailer").unwrap();
    let mut truncated = pdf[..cut].to_vec();
    truncated.extend_from_slice(b"8 0 obj << /Length 100 >>\nstream\nshort");
    let output = from_bytes(&truncated);
    assert!(!output.is_complete());
    assert_eq!(output.texts(), ["early"]);
}

#[test_log::test]
fn parser_hands_out_streams_and_text() {
    let pdf = single_page(b"BT /F1 12 Tf (shared) Tj ET", WIN_ANSI_FONT);
    let mut texts = Vec::new();
    let mut streams = Vec::new();
    {
        let mut parser = PdfParser::new();
        parser.set_text_handler(|text: &str| texts.push(text.to_owned()));
        parser.set_stream_handler(|reference: Reference, data: &[u8]| {
            streams.push((reference, data.len()))
        });
        parser.parse(&pdf[..]).unwrap();
    }
    assert_eq!(texts, ["shared"]);
    assert_eq!(streams, [(Reference::new(4, 0), 27)]);
}

#[test]
fn missing_file_is_an_error() {
    let result = PdfExtractor::default().from_path("/nonexistent/file.pdf");
    assert!(matches!(result, Err(pdf_stream_strings::ParseError::IoError(_))));
}

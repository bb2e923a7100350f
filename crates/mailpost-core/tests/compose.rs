//! Integration tests for message composition.
//!
//! Tokens and time are pinned so composed output is deterministic.

#![allow(clippy::unwrap_used, clippy::similar_names)]

use std::sync::Arc;

use bytes::Bytes;
use chrono::DateTime;
use mailpost_core::{
    Address, Attachment, ComposeConfig, Composer, Error, FixedClock, LoadError, Mailer,
    MemoryTransport, Message, Priority,
};
use mailpost_mime::SequentialTokens;
use mailpost_mime::encoding::{decode_base64, decode_quoted_printable, decode_rfc2047};
use proptest::prelude::*;

const DATE: &str = "Wed, 18 Feb 2015 23:16:09 +0100";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("mailpost_core=trace,mailpost_mime=trace")
        .with_test_writer()
        .try_init();
}

fn composer() -> Composer {
    init_tracing();
    Composer::default()
        .with_tokens(Arc::new(SequentialTokens::default()))
        .with_clock(Arc::new(FixedClock::new(
            DateTime::parse_from_rfc2822(DATE).unwrap(),
        )))
}

fn addr(s: &str) -> Address {
    Address::parse(s).unwrap()
}

fn base() -> mailpost_core::MessageBuilder {
    Message::builder(addr("Ann Lee <ann@example.com>")).to(addr("bob@example.com"))
}

/// Splits a raw message at the first blank line.
fn split(raw: &str) -> (&str, &str) {
    raw.split_once("\r\n\r\n").unwrap()
}

/// Returns the unfolded value of the first header named `name`.
fn header(raw: &str, name: &str) -> Option<String> {
    let (head, _) = split(raw);
    let unfolded = head.replace("\r\n ", " ");
    unfolded.split("\r\n").find_map(|line| {
        let (field, value) = line.split_once(": ")?;
        field
            .eq_ignore_ascii_case(name)
            .then(|| value.to_string())
    })
}

fn header_names(raw: &str) -> Vec<String> {
    let (head, _) = split(raw);
    head.split("\r\n")
        .filter(|line| !line.starts_with(' '))
        .filter_map(|line| line.split_once(':').map(|(name, _)| name.to_string()))
        .collect()
}

#[tokio::test]
async fn test_plain_text_message_exact() {
    let message = base()
        .subject("Lunch")
        .text_body("Noon at the usual place.\nSee you!")
        .build();

    let composed = composer().compose(&message).await.unwrap();

    assert_eq!(
        composed.raw,
        "From: Ann Lee <ann@example.com>\r\n\
         To: bob@example.com\r\n\
         Subject: Lunch\r\n\
         Date: Wed, 18 Feb 2015 23:16:09 +0100\r\n\
         Message-ID: <T0000@example.com>\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         Content-Transfer-Encoding: quoted-printable\r\n\
         \r\n\
         Noon at the usual place.\r\n\
         See you!\r\n"
    );
    assert_eq!(composed.message_id, "<T0000@example.com>");
    assert_eq!(composed.envelope.from, "ann@example.com");
    assert_eq!(composed.envelope.to, vec!["bob@example.com"]);
}

#[tokio::test]
async fn test_header_order() {
    let message = base()
        .cc(addr("carol@example.com"))
        .reply_to(addr("replies@example.com"))
        .subject("Order")
        .priority(Priority::High)
        .header("X-Campaign", "spring")
        .text_body("body")
        .build();

    let composed = composer().compose(&message).await.unwrap();

    assert_eq!(
        header_names(&composed.raw),
        vec![
            "From",
            "To",
            "Cc",
            "Reply-To",
            "Subject",
            "Date",
            "Message-ID",
            "MIME-Version",
            "X-Priority",
            "X-MSMail-Priority",
            "x-campaign",
            "Content-Type",
            "Content-Transfer-Encoding",
        ]
    );
    assert_eq!(header(&composed.raw, "X-Priority").as_deref(), Some("1"));
    assert_eq!(header(&composed.raw, "X-MSMail-Priority").as_deref(), Some("High"));
    assert_eq!(header(&composed.raw, "x-campaign").as_deref(), Some("spring"));
}

#[tokio::test]
async fn test_priority_headers() {
    let low = base().priority(Priority::Low).build();
    let raw = composer().compose(&low).await.unwrap().raw;
    assert_eq!(header(&raw, "X-Priority").as_deref(), Some("5"));
    assert_eq!(header(&raw, "X-MSMail-Priority").as_deref(), Some("Low"));

    let normal = base().build();
    let raw = composer().compose(&normal).await.unwrap().raw;
    assert_eq!(header(&raw, "X-Priority"), None);
    assert_eq!(header(&raw, "X-MSMail-Priority"), None);
}

#[tokio::test]
async fn test_bcc_only_in_envelope() {
    let message = base()
        .cc(addr("carol@example.com"))
        .bcc(addr("Secret Sam <sam@example.com>"))
        .header("Bcc", "leak@example.com")
        .text_body("hello")
        .build();

    let composed = composer().compose(&message).await.unwrap();

    assert_eq!(
        composed.envelope.to,
        vec!["bob@example.com", "carol@example.com", "sam@example.com"]
    );
    assert!(!composed.raw.contains("sam@example.com"));
    assert!(!composed.raw.contains("leak@example.com"));
    assert!(!composed.raw.to_ascii_lowercase().contains("bcc"));
}

#[tokio::test]
async fn test_duplicate_recipients_kept() {
    let message = base().to(addr("bob@example.com")).build();
    let composed = composer().compose(&message).await.unwrap();

    assert_eq!(composed.envelope.to, vec!["bob@example.com", "bob@example.com"]);
    assert_eq!(
        header(&composed.raw, "To").as_deref(),
        Some("bob@example.com, bob@example.com")
    );
}

#[tokio::test]
async fn test_custom_headers_cannot_override() {
    let message = base()
        .subject("Real")
        .header("Subject", "Fake")
        .header("content-type", "text/evil")
        .header("X-Tag", "one")
        .header("X-Tag", "two")
        .header("bad name", "dropped")
        .header("X-Injected", "a\r\nBcc: evil@example.com")
        .build();

    let raw = composer().compose(&message).await.unwrap().raw;

    assert_eq!(header(&raw, "Subject").as_deref(), Some("Real"));
    assert!(!raw.contains("Fake"));
    assert!(!raw.contains("text/evil"));
    assert!(raw.contains("x-tag: one\r\nx-tag: two\r\n"));
    assert!(!raw.contains("dropped"));
    assert!(raw.contains("x-injected: a Bcc: evil@example.com\r\n"));
    assert!(!raw.contains("\r\nBcc:"));
}

#[tokio::test]
async fn test_standard_header_names_reserved_when_not_emitted() {
    let message = base()
        .text_body("t")
        .html_body("<p>h</p>")
        .header("Content-Transfer-Encoding", "base64")
        .header("Cc", "ghost@example.com")
        .header("Reply-To", "ghost@example.com")
        .header("X-Priority", "1")
        .header("X-Kept", "yes")
        .build();

    let composed = composer().compose(&message).await.unwrap();
    let raw = &composed.raw;

    assert!(header(raw, "Content-Type").unwrap().starts_with("multipart/alternative"));
    assert_eq!(header(raw, "Content-Transfer-Encoding"), None);
    assert_eq!(header(raw, "Cc"), None);
    assert_eq!(header(raw, "Reply-To"), None);
    assert_eq!(header(raw, "X-Priority"), None);
    assert!(!raw.contains("ghost@example.com"));
    assert_eq!(header(raw, "x-kept").as_deref(), Some("yes"));
    assert_eq!(composed.envelope.to, vec!["bob@example.com"]);
}

#[tokio::test]
async fn test_long_encoded_name_keeps_lines_short() {
    let message = Message::builder(addr(
        "Ærøskøbing Færgefart Kundeservice <reservations.department@example.com>",
    ))
    .to(addr("bob@example.com"))
    .build();

    let raw = composer().compose(&message).await.unwrap().raw;
    let (head, _) = split(&raw);

    for line in head.split("\r\n") {
        assert!(line.len() <= 76, "{line:?}");
    }
    assert!(
        header(&raw, "From")
            .unwrap()
            .ends_with("?= <reservations.department@example.com>")
    );
}

#[tokio::test]
async fn test_attachment_metadata_cannot_add_headers() {
    let message = base()
        .text_body("see logo")
        .attach(
            Attachment::new("a.png", vec![1u8, 2, 3])
                .content_type("image/png; name=\"a\r\nX-Injected: yes\"")
                .inline("id\r\nX-Also: injected"),
        )
        .build();

    let raw = composer().compose(&message).await.unwrap().raw;

    assert!(!raw.contains("\r\nX-Injected"));
    assert!(!raw.contains("\r\nX-Also"));
    assert!(raw.contains("Content-ID: <idX-Also:injected>\r\n"));
}

#[tokio::test]
async fn test_encoded_names_keep_bare_address() {
    let message = Message::builder(addr("Zoë Ångström <zoe@example.com>"))
        .to(addr("José Núñez <jose@example.com>"))
        .subject("Grüße aus München")
        .build();

    let raw = composer().compose(&message).await.unwrap().raw;

    let from = header(&raw, "From").unwrap();
    assert!(from.starts_with("=?UTF-8?B?"));
    assert!(from.ends_with(" <zoe@example.com>"));
    let name = from.strip_suffix(" <zoe@example.com>").unwrap();
    assert_eq!(decode_rfc2047(name).unwrap(), "Zoë Ångström");

    let to = header(&raw, "To").unwrap();
    assert!(to.ends_with(" <jose@example.com>"));

    let subject = header(&raw, "Subject").unwrap();
    assert_eq!(decode_rfc2047(&subject).unwrap(), "Grüße aus München");
}

#[tokio::test]
async fn test_long_subject_folds() {
    let subject = "Ünïcödé ".repeat(20);
    let message = base().subject(subject.trim_end()).build();

    let raw = composer().compose(&message).await.unwrap().raw;
    let (head, _) = split(&raw);

    for line in head.split("\r\n") {
        assert!(line.len() <= 76, "{line:?}");
    }
    let value = header(&raw, "Subject").unwrap();
    assert_eq!(decode_rfc2047(&value).unwrap(), subject.trim_end());
}

#[tokio::test]
async fn test_subject_line_breaks_replaced() {
    let message = base().subject("Hi\r\nBcc: evil@example.com").build();
    let raw = composer().compose(&message).await.unwrap().raw;

    assert_eq!(
        header(&raw, "Subject").as_deref(),
        Some("Hi Bcc: evil@example.com")
    );
}

#[tokio::test]
async fn test_alternative_structure() {
    let message = base()
        .text_body("Plain version")
        .html_body("<p>HTML version</p>")
        .build();

    let raw = composer().compose(&message).await.unwrap().raw;
    let (_, body) = split(&raw);

    assert_eq!(
        header(&raw, "Content-Type").as_deref(),
        Some("multipart/alternative; boundary=\"=_T0001\"")
    );
    assert_eq!(header(&raw, "Content-Transfer-Encoding"), None);

    let text_at = body.find("Content-Type: text/plain").unwrap();
    let html_at = body.find("Content-Type: text/html").unwrap();
    assert!(text_at < html_at);
    assert_eq!(body.matches("--=_T0001\r\n").count(), 2);
    assert!(body.ends_with("--=_T0001--\r\n"));
}

#[tokio::test]
async fn test_html_only() {
    let message = base().html_body("<b>bold</b>").build();
    let raw = composer().compose(&message).await.unwrap().raw;

    assert_eq!(
        header(&raw, "Content-Type").as_deref(),
        Some("text/html; charset=utf-8")
    );
    assert!(!raw.contains("multipart"));
}

#[tokio::test]
async fn test_mixed_with_alternative_and_attachments() {
    let pdf = Bytes::from_static(b"%PDF-1.4\nfake pdf bytes");
    let message = base()
        .text_body("See attached")
        .html_body("<p>See attached</p>")
        .attach(Attachment::new("report.pdf", pdf.clone()).content_type("application/pdf"))
        .attach(Attachment::new("logo.png", vec![0x89u8, b'P', b'N', b'G']).inline("logo"))
        .build();

    let raw = composer().compose(&message).await.unwrap().raw;
    let (_, body) = split(&raw);

    assert_eq!(
        header(&raw, "Content-Type").as_deref(),
        Some("multipart/mixed; boundary=\"=_T0002\"")
    );
    assert!(body.starts_with("--=_T0002\r\nContent-Type: multipart/alternative; boundary=\"=_T0001\"\r\n\r\n"));

    assert!(body.contains(
        "Content-Type: application/pdf\r\n\
         Content-Transfer-Encoding: base64\r\n\
         Content-Disposition: attachment; filename=\"report.pdf\"\r\n\r\n"
    ));
    assert!(body.contains(
        "Content-Type: application/octet-stream\r\n\
         Content-Transfer-Encoding: base64\r\n\
         Content-Disposition: inline; filename=\"logo.png\"\r\n\
         Content-ID: <logo>\r\n\r\n"
    ));

    let pdf_at = body.find("report.pdf").unwrap();
    let logo_at = body.find("logo.png").unwrap();
    assert!(pdf_at < logo_at);

    let encoded = body[pdf_at..].split("\r\n\r\n").nth(1).unwrap();
    let encoded = encoded.split("\r\n--").next().unwrap();
    assert_eq!(decode_base64(encoded).unwrap(), pdf.to_vec());

    assert!(body.ends_with("--=_T0002--\r\n"));
}

#[tokio::test]
async fn test_deferred_attachment_loaded() {
    let message = base()
        .text_body("Report inside")
        .attach(
            Attachment::from_fn("data.csv", || async {
                Ok::<_, LoadError>(Bytes::from_static(b"a,b\n1,2\n"))
            })
            .content_type("text/csv"),
        )
        .build();

    let raw = composer().compose(&message).await.unwrap().raw;
    assert!(raw.contains("filename=\"data.csv\""));
    assert!(raw.contains("YSxiCjEsMgo="));
}

#[tokio::test]
async fn test_deferred_attachment_failure() {
    let message = base()
        .text_body("Report inside")
        .attach(Attachment::new("first.txt", &b"ok"[..]))
        .attach(Attachment::from_fn("missing.csv", || async {
            Err::<Bytes, LoadError>("file not found".into())
        }))
        .build();

    let err = composer().compose(&message).await.unwrap_err();
    match err {
        Error::AttachmentLoad { filename, source } => {
            assert_eq!(filename, "missing.csv");
            assert_eq!(source.to_string(), "file not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_fresh_ids_per_composition() {
    let message = base().text_body("a").html_body("<p>a</p>").build();
    let composer = Composer::default();

    let first = composer.compose(&message).await.unwrap();
    let second = composer.compose(&message).await.unwrap();

    assert_ne!(first.message_id, second.message_id);
    assert_ne!(
        header(&first.raw, "Content-Type"),
        header(&second.raw, "Content-Type")
    );
}

#[tokio::test]
async fn test_message_id_domain_override() {
    let composer = Composer::new(
        ComposeConfig::builder()
            .message_id_domain("mail.example.net")
            .build(),
    )
    .with_tokens(Arc::new(SequentialTokens::default()));

    let composed = composer.compose(&base().build()).await.unwrap();
    assert_eq!(composed.message_id, "<T0000@mail.example.net>");
}

#[tokio::test]
async fn test_crlf_only_and_single_blank_line() {
    let message = base()
        .subject("Line endings")
        .text_body("one\ntwo\r\nthree")
        .html_body("<p>one</p>\n<p>two</p>")
        .attach(Attachment::new("a.bin", vec![0u8; 200]))
        .build();

    let raw = composer().compose(&message).await.unwrap().raw;

    assert!(!raw.replace("\r\n", "").contains('\n'));
    assert!(!raw.replace("\r\n", "").contains('\r'));
    assert!(raw.ends_with("\r\n"));

    let (head, body) = split(&raw);
    assert!(!head.contains("\r\n\r\n"));
    assert!(!body.starts_with("\r\n"));

    let text = body
        .split("Content-Transfer-Encoding: quoted-printable\r\n\r\n")
        .nth(1)
        .unwrap()
        .split("\r\n--")
        .next()
        .unwrap();
    assert_eq!(decode_quoted_printable(text).unwrap(), "one\r\ntwo\r\nthree");
}

#[tokio::test]
async fn test_mailer_delivers_to_memory() {
    init_tracing();
    let mailer = Mailer::with_composer(composer(), MemoryTransport::new());

    let report = mailer
        .deliver(&base().bcc(addr("audit@example.com")).text_body("hi").build())
        .await
        .unwrap();

    assert_eq!(report.message_id, "<T0000@example.com>");
    assert_eq!(report.recipients, vec!["bob@example.com", "audit@example.com"]);

    let deliveries = mailer.transport().deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].envelope.to, report.recipients);
    assert!(deliveries[0].raw.starts_with("From: Ann Lee <ann@example.com>\r\n"));
}

proptest! {
    #[test]
    fn prop_envelope_order(
        to in prop::collection::vec("[a-z]{1,8}", 1..4),
        cc in prop::collection::vec("[a-z]{1,8}", 0..4),
        bcc in prop::collection::vec("[a-z]{1,8}", 0..4),
    ) {
        let mut builder = Message::builder(addr("me@example.com"));
        for local in &to {
            builder = builder.to(addr(&format!("{local}@to.example")));
        }
        for local in &cc {
            builder = builder.cc(addr(&format!("{local}@cc.example")));
        }
        for local in &bcc {
            builder = builder.bcc(addr(&format!("{local}@bcc.example")));
        }
        let message = builder.build();

        let composed = tokio_test::block_on(Composer::default().compose(&message)).unwrap();

        let expected: Vec<String> = to
            .iter()
            .map(|l| format!("{l}@to.example"))
            .chain(cc.iter().map(|l| format!("{l}@cc.example")))
            .chain(bcc.iter().map(|l| format!("{l}@bcc.example")))
            .collect();
        prop_assert_eq!(&composed.envelope.to, &expected);
        prop_assert!(!composed.raw.contains("@bcc.example"));
    }
}

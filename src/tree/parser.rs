use crate::{
    errors::MalformedSource,
    span::Span,
    tree::raw::{InstanceProfile, RawNode, RawNodeId, RawTree},
};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_till1, take_until, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::map,
    multi::many0,
    sequence::{delimited, pair, tuple},
    IResult, Parser as NomParser,
};
use std::collections::BTreeMap;
use tracing::debug;

const PROFILE: &str = "instance-profile";
const TOC_ELEMENT: &str = "toc-element";

#[derive(Debug)]
enum Markup<'a> {
    Skipped,
    Text(&'a str),
    Open {
        name: &'a str,
        attributes: Vec<(&'a str, &'a str)>,
        self_closing: bool,
    },
    Close(&'a str),
}

fn element_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
        delimited(char('\''), take_till(|c: char| c == '\''), char('\'')),
    ))(input)
}

fn attribute(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = multispace1(input)?;
    let (input, key) = element_name(input)?;
    let (input, _) = tuple((multispace0, char('='), multispace0))(input)?;
    let (input, value) = quoted(input)?;
    Ok((input, (key, value)))
}

fn open_tag(input: &str) -> IResult<&str, Markup<'_>> {
    let (input, _) = char('<')(input)?;
    let (input, name) = element_name(input)?;
    let (input, attributes) = many0(attribute)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, closing) = alt((tag("/>"), tag(">")))(input)?;
    Ok((
        input,
        Markup::Open {
            name,
            attributes,
            self_closing: closing == "/>",
        },
    ))
}

fn close_tag(input: &str) -> IResult<&str, Markup<'_>> {
    map(
        delimited(tag("</"), element_name, pair(multispace0, char('>'))),
        Markup::Close,
    )
    .parse(input)
}

fn skipped(input: &str) -> IResult<&str, Markup<'_>> {
    map(
        alt((
            delimited(tag("<!--"), take_until("-->"), tag("-->")),
            delimited(tag("<?"), take_until("?>"), tag("?>")),
            delimited(tag("<!DOCTYPE"), take_till(|c: char| c == '>'), char('>')),
        )),
        |_| Markup::Skipped,
    )
    .parse(input)
}

fn text(input: &str) -> IResult<&str, Markup<'_>> {
    map(take_till1(|c: char| c == '<'), Markup::Text).parse(input)
}

fn markup(input: &str) -> IResult<&str, Markup<'_>> {
    alt((skipped, close_tag, open_tag, text))(input)
}

enum OpenElement {
    Profile,
    Topic(RawNodeId),
}

impl OpenElement {
    fn name(&self) -> &'static str {
        match self {
            OpenElement::Profile => PROFILE,
            OpenElement::Topic(_) => TOC_ELEMENT,
        }
    }
}

/// Parses a tree declaration into its raw shape.
///
/// Declaration order is preserved. No reference is checked here; that is the validator's job.
pub fn parse_source(source: &str) -> Result<RawTree, MalformedSource> {
    TreeParser::new(source).run()
}

struct TreeParser<'a> {
    src: &'a str,
    tree: Option<RawTree>,
    stack: Vec<(OpenElement, Span)>,
}

impl<'a> TreeParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            tree: None,
            stack: Vec::new(),
        }
    }

    fn run(mut self) -> Result<RawTree, MalformedSource> {
        // Offsets stay relative to `src`, so spans still index the text as read.
        let mut rest = self.src.strip_prefix('\u{feff}').unwrap_or(self.src);
        while !rest.is_empty() {
            let offset = self.offset(rest);
            let (next, item) = markup(rest).map_err(|_| markup_error(rest, offset))?;
            let span = Span::new(offset, self.offset(next));
            match item {
                Markup::Skipped => {}
                Markup::Text(text) => {
                    if !text.trim().is_empty() {
                        let lead = text.len() - text.trim_start().len();
                        let start = offset + lead;
                        return Err(MalformedSource::new(
                            "unexpected text content",
                            Span::new(start, start + text.trim().len()),
                        )
                        .with_help("tree declarations only contain elements and comments"));
                    }
                }
                Markup::Open {
                    name,
                    attributes,
                    self_closing,
                } => self.open(name, &attributes, self_closing, span)?,
                Markup::Close(name) => self.close(name, span)?,
            }
            rest = next;
        }

        if let Some((element, span)) = self.stack.last() {
            return Err(MalformedSource::new(
                format!("unclosed element <{}>", element.name()),
                *span,
            ));
        }
        let end = self.src.len();
        let tree = self.tree.ok_or_else(|| {
            MalformedSource::new(
                format!("missing <{PROFILE}> root element"),
                Span::new(end, end),
            )
        })?;
        debug!(
            instance = %tree.profile.id,
            nodes = tree.len(),
            "parsed tree declaration"
        );
        Ok(tree)
    }

    fn offset(&self, rest: &str) -> usize {
        self.src.len() - rest.len()
    }

    fn open(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        self_closing: bool,
        span: Span,
    ) -> Result<(), MalformedSource> {
        let mut attributes = collect_attributes(name, attributes, span)?;
        let element = match name {
            PROFILE => {
                if !self.stack.is_empty() {
                    return Err(MalformedSource::new(
                        format!("<{PROFILE}> must be the root element"),
                        span,
                    ));
                }
                if self.tree.is_some() {
                    return Err(MalformedSource::new("duplicate root element", span)
                        .with_help(format!("a tree declares exactly one <{PROFILE}>")));
                }
                let id = required(&mut attributes, PROFILE, "id", span)?;
                let start_page = match split_location(
                    &required(&mut attributes, PROFILE, "start-page", span)?,
                    span,
                )? {
                    (reference, Some(fragment)) => format!("{reference}#{fragment}"),
                    (reference, None) => reference,
                };
                let name = attributes.remove("name").unwrap_or_else(|| id.clone());
                ignore_rest(PROFILE, &attributes);
                self.tree = Some(RawTree::new(InstanceProfile {
                    id,
                    name,
                    start_page,
                    span,
                }));
                OpenElement::Profile
            }
            TOC_ELEMENT => {
                let parent = match self.stack.last() {
                    Some((OpenElement::Profile, _)) => None,
                    Some((OpenElement::Topic(parent), _)) => Some(*parent),
                    None => {
                        return Err(MalformedSource::new(
                            format!("<{TOC_ELEMENT}> outside the root element"),
                            span,
                        )
                        .with_help(format!("nest entries inside <{PROFILE}>")))
                    }
                };
                let node = topic_node(&mut attributes, span)?;
                ignore_rest(TOC_ELEMENT, &attributes);
                let Some(tree) = self.tree.as_mut() else {
                    return Err(MalformedSource::new(
                        format!("<{TOC_ELEMENT}> outside the root element"),
                        span,
                    ));
                };
                OpenElement::Topic(tree.push(parent, node))
            }
            other => {
                return Err(
                    MalformedSource::new(format!("unexpected element <{other}>"), span)
                        .with_help(format!("expected <{PROFILE}> or <{TOC_ELEMENT}>")),
                )
            }
        };
        if !self_closing {
            self.stack.push((element, span));
        }
        Ok(())
    }

    fn close(&mut self, name: &str, span: Span) -> Result<(), MalformedSource> {
        let Some((element, _)) = self.stack.pop() else {
            return Err(MalformedSource::new(
                format!("unexpected closing tag </{name}>"),
                span,
            ));
        };
        if element.name() != name {
            return Err(MalformedSource::new(
                format!(
                    "mismatched closing tag: expected </{}>, found </{name}>",
                    element.name()
                ),
                span,
            ));
        }
        Ok(())
    }
}

fn markup_error(rest: &str, offset: usize) -> MalformedSource {
    let span = Span::new(offset, offset + rest.chars().next().map_or(0, char::len_utf8));
    if rest.starts_with("<!--") {
        MalformedSource::new("unterminated comment", span)
    } else if rest.starts_with("<?") {
        MalformedSource::new("unterminated processing instruction", span)
    } else if rest.starts_with("</") {
        MalformedSource::new("malformed closing tag", span)
    } else {
        MalformedSource::new("malformed element tag", span)
            .with_help("attribute values must be quoted, e.g. topic=\"intro.md\"")
    }
}

fn collect_attributes(
    element: &str,
    raw: &[(&str, &str)],
    span: Span,
) -> Result<BTreeMap<String, String>, MalformedSource> {
    let mut attributes = BTreeMap::new();
    for (key, value) in raw {
        let value = decode_entities(value, span)?;
        if attributes.insert(key.to_string(), value).is_some() {
            return Err(MalformedSource::new(
                format!("duplicate attribute `{key}` on <{element}>"),
                span,
            ));
        }
    }
    Ok(attributes)
}

fn required(
    attributes: &mut BTreeMap<String, String>,
    element: &str,
    key: &str,
    span: Span,
) -> Result<String, MalformedSource> {
    match attributes.remove(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Some(_) => Err(MalformedSource::new(
            format!("empty `{key}` attribute on <{element}>"),
            span,
        )),
        None => Err(MalformedSource::new(
            format!("<{element}> is missing the mandatory `{key}` attribute"),
            span,
        )),
    }
}

fn topic_node(
    attributes: &mut BTreeMap<String, String>,
    span: Span,
) -> Result<RawNode, MalformedSource> {
    let topic = required(attributes, TOC_ELEMENT, "topic", span)?;
    let (reference, fragment) = split_location(&topic, span)?;
    let mut node = RawNode::new(reference, span);
    if let Some(fragment) = fragment {
        node = node.with_fragment(fragment);
    }
    if attributes.contains_key("id") {
        node = node.with_identifier(required(attributes, TOC_ELEMENT, "id", span)?);
    }
    node.title = attributes.remove("toc-title");
    Ok(node)
}

/// Splits `path#anchor` and normalizes the path part.
fn split_location(
    location: &str,
    span: Span,
) -> Result<(String, Option<String>), MalformedSource> {
    let (path, fragment) = match location.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (location, None),
    };
    let reference = normalize_reference(path);
    if reference.is_empty() {
        return Err(MalformedSource::new(
            format!("empty content reference in `{location}`"),
            span,
        ));
    }
    match fragment {
        Some("") => Err(MalformedSource::new("empty fragment anchor after `#`", span)),
        Some(fragment) => Ok((reference, Some(fragment.to_string()))),
        None => Ok((reference, None)),
    }
}

/// One spelling per resource: `.` segments and repeated `/` are dropped. A leading `/` and
/// `..` segments are kept so content lookups can refuse them.
fn normalize_reference(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/");
    if path.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

fn ignore_rest(element: &str, attributes: &BTreeMap<String, String>) {
    for key in attributes.keys() {
        debug!(element, attribute = %key, "ignoring attribute");
    }
}

fn decode_entities(raw: &str, span: Span) -> Result<String, MalformedSource> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let Some(semi) = after.find(';') else {
            return Err(MalformedSource::new("unterminated entity reference", span));
        };
        let entity = &after[..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                .and_then(Result::ok)
                .and_then(char::from_u32),
        };
        match decoded {
            Some(ch) => out.push(ch),
            None => {
                return Err(MalformedSource::new(
                    format!("unknown entity `&{entity};`"),
                    span,
                ))
            }
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE instance-profile SYSTEM "https://resources.jetbrains.com/writerside/1.0/product-profile.dtd">
<instance-profile id="sg" name="Style Guide" start-page="overview.md">
    <!-- top level -->
    <toc-element topic="overview.md"/>
    <toc-element topic="naming.md" id="naming" toc-title="Naming &amp; Case">
        <toc-element topic="naming-functions.md#verbs"/>
        <toc-element topic='naming-types.md'></toc-element>
    </toc-element>
    <toc-element topic="errors.md" accepts-web-file-names="errors.html"/>
</instance-profile>
"#;

    fn message(source: &str) -> String {
        parse_source(source).expect_err("expected malformed").message
    }

    #[test]
    fn parses_profile_and_preserves_order() {
        let tree = parse_source(SAMPLE).expect("parse");
        assert_eq!(tree.profile.id, "sg");
        assert_eq!(tree.profile.name, "Style Guide");
        assert_eq!(tree.profile.start_page, "overview.md");
        let top: Vec<_> = tree
            .roots
            .iter()
            .map(|id| tree.nodes[*id].reference.as_str())
            .collect();
        assert_eq!(top, ["overview.md", "naming.md", "errors.md"]);

        let naming = &tree.nodes[tree.roots[1]];
        assert_eq!(naming.identifier.as_deref(), Some("naming"));
        assert_eq!(naming.title.as_deref(), Some("Naming & Case"));
        let children: Vec<_> = naming
            .children
            .iter()
            .map(|id| tree.nodes[*id].location())
            .collect();
        assert_eq!(children, ["naming-functions.md#verbs", "naming-types.md"]);
        assert!(tree.nodes[tree.roots[0]].identifier.is_none());
    }

    #[test]
    fn splits_fragment_anchor() {
        let tree = parse_source(SAMPLE).expect("parse");
        let node = tree
            .nodes
            .iter()
            .find(|node| node.reference == "naming-functions.md")
            .expect("node");
        assert_eq!(node.fragment.as_deref(), Some("verbs"));
    }

    #[test]
    fn name_defaults_to_id() {
        let tree = parse_source(r#"<instance-profile id="x" start-page="a.md"/>"#).expect("parse");
        assert_eq!(tree.profile.name, "x");
        assert!(tree.is_empty());
    }

    #[test]
    fn element_spans_point_at_tags() {
        let source = r#"<instance-profile id="x" start-page="a.md"><toc-element topic="a.md"/></instance-profile>"#;
        let tree = parse_source(source).expect("parse");
        let span = tree.nodes[0].span;
        assert_eq!(&source[span.start..span.end], r#"<toc-element topic="a.md"/>"#);
    }

    #[test]
    fn rejects_missing_topic() {
        let msg = message(
            r#"<instance-profile id="x" start-page="a.md"><toc-element id="a"/></instance-profile>"#,
        );
        assert!(msg.contains("`topic`"), "{msg}");
    }

    #[test]
    fn rejects_missing_and_duplicate_root() {
        assert!(message("<!-- nothing -->").contains("missing <instance-profile>"));
        let msg = message(
            r#"<instance-profile id="x" start-page="a.md"/><instance-profile id="y" start-page="a.md"/>"#,
        );
        assert_eq!(msg, "duplicate root element");
    }

    #[test]
    fn rejects_broken_nesting() {
        let unclosed = message(
            r#"<instance-profile id="x" start-page="a.md"><toc-element topic="a.md"></instance-profile>"#,
        );
        assert!(unclosed.contains("mismatched closing tag"), "{unclosed}");

        let open = message(r#"<instance-profile id="x" start-page="a.md"><toc-element topic="a.md">"#);
        assert_eq!(open, "unclosed element <toc-element>");

        let stray = message(r#"<instance-profile id="x" start-page="a.md"/></toc-element>"#);
        assert!(stray.contains("unexpected closing tag"), "{stray}");
    }

    #[test]
    fn rejects_entries_outside_root_and_unknown_elements() {
        let outside = message(r#"<toc-element topic="a.md"/>"#);
        assert!(outside.contains("outside the root"), "{outside}");
        let unknown = message(r#"<instance-profile id="x" start-page="a.md"><chapter/></instance-profile>"#);
        assert!(unknown.contains("unexpected element <chapter>"), "{unknown}");
    }

    #[test]
    fn rejects_text_and_unquoted_attributes() {
        let text = parse_source(r#"<instance-profile id="x" start-page="a.md">hello</instance-profile>"#)
            .expect_err("text");
        assert_eq!(text.message, "unexpected text content");
        assert_eq!(text.span.len(), "hello".len());

        let unquoted = message(r#"<instance-profile id=x start-page="a.md"/>"#);
        assert_eq!(unquoted, "malformed element tag");
    }

    #[test]
    fn rejects_duplicate_attributes_and_missing_start_page() {
        let dup = message(r#"<instance-profile id="x" id="y" start-page="a.md"/>"#);
        assert!(dup.contains("duplicate attribute `id`"), "{dup}");
        let start = message(r#"<instance-profile id="x"/>"#);
        assert!(start.contains("`start-page`"), "{start}");
    }

    #[test]
    fn decodes_numeric_entities() {
        let tree = parse_source(
            r#"<instance-profile id="x" start-page="a.md"><toc-element topic="a&#45;b&#x2e;md"/></instance-profile>"#,
        )
        .expect("parse");
        assert_eq!(tree.nodes[0].reference, "a-b.md");
        assert!(message(r#"<instance-profile id="x" start-page="&nbsp;"/>"#).contains("unknown entity"));
    }

    #[test]
    fn byte_order_mark_is_skipped_and_spans_keep_their_offsets() {
        let source = "\u{feff}<?xml version=\"1.0\"?>\n<instance-profile id=\"x\" start-page=\"a.md\"><toc-element topic=\"a.md\"/></instance-profile>";
        let tree = parse_source(source).expect("parse");
        assert_eq!(tree.profile.id, "x");
        let span = tree.nodes[0].span;
        assert_eq!(&source[span.start..span.end], r#"<toc-element topic="a.md"/>"#);

        let late = message("<instance-profile id=\"x\" start-page=\"a.md\">\u{feff}</instance-profile>");
        assert_eq!(late, "unexpected text content");
    }

    #[test]
    fn references_are_normalized() {
        let tree = parse_source(
            r#"<instance-profile id="x" start-page="./docs//a.md#top">
                <toc-element topic="./a.md"/>
                <toc-element topic="x/./b.md#verbs"/>
                <toc-element topic="../up.md"/>
                <toc-element topic="/abs.md"/>
            </instance-profile>"#,
        )
        .expect("parse");
        assert_eq!(tree.profile.start_page, "docs/a.md#top");
        let locations: Vec<_> = tree.nodes.iter().map(|node| node.location()).collect();
        assert_eq!(locations, ["a.md", "x/b.md#verbs", "../up.md", "/abs.md"]);

        let empty = message(
            r#"<instance-profile id="x" start-page="a.md"><toc-element topic="./#top"/></instance-profile>"#,
        );
        assert!(empty.contains("empty content reference"), "{empty}");
    }

    #[test]
    fn deep_nesting_parses_without_recursion() {
        let depth = 20_000;
        let mut source = String::from(r#"<instance-profile id="deep" start-page="t0.md">"#);
        for level in 0..depth {
            source.push_str(&format!(r#"<toc-element topic="t{level}.md">"#));
        }
        for _ in 0..depth {
            source.push_str("</toc-element>");
        }
        source.push_str("</instance-profile>");
        let tree = parse_source(&source).expect("parse");
        assert_eq!(tree.len(), depth);
        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.nodes[depth - 2].children, vec![depth - 1]);
    }
}

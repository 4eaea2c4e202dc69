//! Server-rendered dashboard page.
//!
//! Every string that came from a loaded file, the log or the user is passed
//! through `escape_html` before it reaches the markup.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use migscope_core::views::{
    self, Cell, DatasetMetric, DatasetSample, DatasetTab, TableRow, TableView,
};
use migscope_core::{DatasetKey, StateStore, SAMPLE_SIZE};
use migscope_loader::{Notice, NoticeTone};

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Everything the page shows, captured from one read of the store.
#[derive(Debug, Clone)]
pub struct PageModel {
    pub notice: Option<Notice>,
    pub prefix: String,
    pub source_label: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub hidden: bool,
    pub summary: String,
    pub metrics: Vec<DatasetMetric>,
    pub tabs: Vec<DatasetTab>,
    pub table: TableView,
    pub samples: Vec<DatasetSample>,
    pub log_text: String,
    pub self_test_url: String,
}

impl PageModel {
    pub fn build(
        store: &StateStore,
        notice: Option<Notice>,
        prefix: Option<String>,
        log_text: String,
        self_test_url: String,
    ) -> Self {
        Self {
            notice,
            prefix: prefix.unwrap_or_default(),
            source_label: store.source_label().map(str::to_string),
            loaded_at: store.loaded_at(),
            hidden: views::is_hidden(store),
            summary: views::summary_or_placeholder(store),
            metrics: views::metrics(store),
            tabs: views::dataset_tabs(store),
            table: views::active_table(store),
            samples: views::samples(store, SAMPLE_SIZE),
            log_text,
            self_test_url,
        }
    }
}

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:1.5rem;color:#1d2330;background:#f6f7fb}\
header h1{margin:0 0 1rem;font-size:1.4rem}\
section{background:#fff;border:1px solid #d9dce6;border-radius:6px;padding:1rem;margin-bottom:1rem}\
form{display:inline-block;margin:0 1rem .5rem 0}\
.notice{padding:.6rem 1rem;border-radius:6px;margin-bottom:1rem}\
.notice.info{background:#e7f0ff}.notice.success{background:#e3f6e8}\
.notice.warning{background:#fff4d6}.notice.error{background:#fde2e2}\
.metrics{display:flex;gap:1rem}.metric{flex:1}.metric strong{font-size:1.6rem;display:block}\
.tabs button{margin-right:.3rem}.tabs button.active{font-weight:bold;border-bottom:2px solid #3454d1}\
.tabs button.empty{opacity:.55}\
.table-wrap{overflow:auto;max-height:32rem}\
table{border-collapse:collapse;font-size:.85rem}th,td{border:1px solid #e1e4ec;padding:.25rem .5rem;vertical-align:top}\
th{background:#eef0f6;position:sticky;top:0}\
td code{white-space:pre-wrap;word-break:break-all}.missing{color:#9aa0ad}\
pre{background:#11141c;color:#d7dae3;padding:.75rem;max-height:18rem;overflow:auto;font-size:.8rem}\
pre.summary,pre.sample{background:#f3f4f8;color:#1d2330}";

pub fn render_page(model: &PageModel) -> String {
    let mut out = String::with_capacity(16 * 1024);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>migscope</title>\n<style>");
    out.push_str(STYLE);
    out.push_str("</style>\n</head>\n<body>\n<header><h1>Migration data console</h1></header>\n");

    if let Some(notice) = &model.notice {
        let _ = writeln!(
            out,
            "<div class=\"notice {}\" role=\"status\">{}</div>",
            tone_class(notice.tone),
            escape_html(&notice.text)
        );
    }

    render_controls(&mut out, model);

    if !model.hidden {
        render_source(&mut out, model);
        render_summary(&mut out, &model.summary);
        render_metrics(&mut out, &model.metrics);
        render_tabs(&mut out, &model.tabs);
        render_table(&mut out, &model.table);
        render_samples(&mut out, &model.samples);
    }

    out.push_str("<section class=\"log\"><h2>Log</h2>\n<pre id=\"log\">");
    out.push_str(&escape_html(&model.log_text));
    out.push_str("</pre>\n</section>\n</body>\n</html>\n");
    out
}

fn tone_class(tone: NoticeTone) -> &'static str {
    match tone {
        NoticeTone::Info => "info",
        NoticeTone::Success => "success",
        NoticeTone::Warning => "warning",
        NoticeTone::Error => "error",
    }
}

fn render_controls(out: &mut String, model: &PageModel) {
    out.push_str("<section class=\"controls\">\n");
    let _ = writeln!(
        out,
        "<form method=\"post\" action=\"/load\">\
<label>Prefix <input name=\"prefix\" value=\"{}\" placeholder=\"2025/run-01\"></label> \
<button type=\"submit\">Load</button></form>",
        escape_html(&model.prefix)
    );

    out.push_str(
        "<form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\
<label>Summary <input type=\"file\" name=\"summary\" accept=\".json\"></label> ",
    );
    for key in DatasetKey::ALL {
        let _ = write!(
            out,
            "<label>{} <input type=\"file\" name=\"{}\" accept=\".ndjson,.jsonl,.txt\"></label> ",
            key.label(),
            key.as_str()
        );
    }
    out.push_str("<button type=\"submit\">Load files</button></form>\n");

    let _ = writeln!(
        out,
        "<form method=\"post\" action=\"/self-test\">\
<button type=\"submit\" title=\"{}\">Run self-test</button></form>",
        escape_html(&model.self_test_url)
    );
    out.push_str("</section>\n");
}

fn render_source(out: &mut String, model: &PageModel) {
    let Some(label) = &model.source_label else {
        return;
    };
    let when = model
        .loaded_at
        .map(|t| t.format(" at %Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default();
    let _ = writeln!(
        out,
        "<p class=\"source\">Showing {}{}</p>",
        escape_html(label),
        when
    );
}

fn render_summary(out: &mut String, summary: &str) {
    out.push_str("<section><h2>Summary</h2>\n<pre class=\"summary\">");
    out.push_str(&escape_html(summary));
    out.push_str("</pre>\n</section>\n");
}

fn render_metrics(out: &mut String, metrics: &[DatasetMetric]) {
    out.push_str("<section class=\"metrics\">\n");
    for m in metrics {
        let _ = writeln!(
            out,
            "<div class=\"metric\" data-dataset=\"{}\"><span>{}</span><strong>{}</strong>\
<small>{} exported</small></div>",
            m.key.as_str(),
            m.label,
            m.total,
            m.exported
        );
    }
    out.push_str("</section>\n");
}

fn render_tabs(out: &mut String, tabs: &[DatasetTab]) {
    out.push_str("<nav class=\"tabs\">\n");
    for tab in tabs {
        let mut class = String::new();
        if tab.active {
            class.push_str("active");
        }
        if tab.empty {
            if !class.is_empty() {
                class.push(' ');
            }
            class.push_str("empty");
        }
        let _ = writeln!(
            out,
            "<form method=\"post\" action=\"/dataset/{}\"><button type=\"submit\" class=\"{}\">{} ({})</button></form>",
            tab.key.as_str(),
            class,
            tab.label,
            tab.count
        );
    }
    out.push_str("</nav>\n");
}

fn render_table(out: &mut String, table: &TableView) {
    out.push_str("<section class=\"table-wrap\">\n");
    if table.is_empty() {
        out.push_str("<p class=\"empty\">No records in this dataset.</p>\n</section>\n");
        return;
    }

    out.push_str("<table>\n<thead><tr>");
    if table.columns.is_empty() {
        out.push_str("<th></th>");
    }
    for col in &table.columns {
        let _ = write!(out, "<th>{}</th>", escape_html(col));
    }
    out.push_str("</tr></thead>\n<tbody>\n");

    let width = table.header_width();
    for row in &table.rows {
        out.push_str("<tr>");
        match row {
            TableRow::Fields(cells) => {
                for cell in cells {
                    out.push_str("<td>");
                    render_cell(out, cell);
                    out.push_str("</td>");
                }
            }
            TableRow::Value(cell) => {
                let _ = write!(out, "<td colspan=\"{width}\">");
                render_cell(out, cell);
                out.push_str("</td>");
            }
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n</section>\n");
}

fn render_samples(out: &mut String, samples: &[DatasetSample]) {
    if samples.is_empty() {
        return;
    }
    out.push_str("<section class=\"samples\"><h2>Samples</h2>\n");
    for sample in samples {
        let _ = writeln!(
            out,
            "<details data-dataset=\"{}\"><summary>{} (first {} of {})</summary>",
            sample.key.as_str(),
            sample.label,
            sample.records.len(),
            sample.total
        );
        for record in &sample.records {
            let _ = writeln!(out, "<pre class=\"sample\">{}</pre>", escape_html(record));
        }
        out.push_str("</details>\n");
    }
    out.push_str("</section>\n");
}

fn render_cell(out: &mut String, cell: &Cell) {
    match cell {
        Cell::Missing => {
            let _ = write!(out, "<span class=\"missing\">{}</span>", cell.text());
        }
        Cell::Structured(json) => {
            let _ = write!(out, "<code>{}</code>", escape_html(json));
        }
        Cell::Timestamp(ts) => {
            let _ = write!(out, "<time datetime=\"{0}\">{0}</time>", escape_html(ts));
        }
        Cell::Bool(_) | Cell::Text(_) => out.push_str(&escape_html(&cell.text())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migscope_core::LoadPayload;
    use serde_json::json;

    fn model_for(store: &StateStore) -> PageModel {
        PageModel::build(store, None, None, String::new(), "http://st".into())
    }

    #[test]
    fn escapes_all_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jo'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jo&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn empty_store_hides_data_sections() {
        let html = render_page(&model_for(&StateStore::new()));
        assert!(html.contains("action=\"/load\""));
        assert!(html.contains("id=\"log\""));
        assert!(!html.contains("<h2>Summary</h2>"));
        assert!(!html.contains("class=\"tabs\""));
        assert!(!html.contains("<h2>Samples</h2>"));
    }

    #[test]
    fn samples_are_escaped_and_limited() {
        let mut store = StateStore::new();
        store.apply(
            LoadPayload {
                messages: (0..5).map(|i| json!({"body": format!("<p>{i}</p>")})).collect(),
                ..Default::default()
            },
            "test",
        );
        let html = render_page(&model_for(&store));
        assert!(html.contains("<h2>Samples</h2>"));
        assert!(html.contains("Messages (first 3 of 5)</summary>"));
        assert_eq!(html.matches("<pre class=\"sample\">").count(), SAMPLE_SIZE);
        assert!(html.contains("&quot;body&quot;: &quot;&lt;p&gt;0&lt;/p&gt;&quot;"));
        assert!(!html.contains("<p>0</p>"));
        assert!(!html.contains("data-dataset=\"contacts\"><summary>"));
    }

    #[test]
    fn record_content_is_escaped_in_cells_and_headers() {
        let mut store = StateStore::new();
        store.apply(
            LoadPayload {
                contacts: vec![json!({"<b>": "<script>alert(1)</script>", "meta": {"x": "<i>"}})],
                ..Default::default()
            },
            "test",
        );
        let html = render_page(&model_for(&store));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("<th>&lt;b&gt;</th>"));
        assert!(html.contains("<code>{&quot;x&quot;:&quot;&lt;i&gt;&quot;}</code>"));
    }

    #[test]
    fn non_object_rows_span_the_header() {
        let mut store = StateStore::new();
        store.apply(
            LoadPayload {
                chats: vec![json!({"a": 1, "b": 2}), json!("loose line")],
                ..Default::default()
            },
            "test",
        );
        let html = render_page(&model_for(&store));
        assert!(html.contains("<td colspan=\"2\">loose line</td>"));
        assert!(html.contains("class=\"active\">Chats (2)"));
        assert!(html.contains("class=\"empty\">Contacts (0)"));
    }

    #[test]
    fn notice_and_log_are_escaped() {
        let store = StateStore::new();
        let notice = Notice {
            tone: NoticeTone::Error,
            text: "Load failed: <bad>".into(),
            at: Utc::now(),
        };
        let model = PageModel::build(
            &store,
            Some(notice),
            Some("run\"1".into()),
            "12:00:00 [warn] <x>".into(),
            "http://st".into(),
        );
        let html = render_page(&model);
        assert!(html.contains("<div class=\"notice error\" role=\"status\">Load failed: &lt;bad&gt;</div>"));
        assert!(html.contains("value=\"run&quot;1\""));
        assert!(html.contains("[warn] &lt;x&gt;"));
    }
}

//! Static HTML pages.

use axum::response::Html;

/// Table of captured records, rendered client-side from `/logs`.
const VIEW_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Captured Logs</title>
    <script src="/static/jquery.min.js"></script>
    <script src="/static/datatables.min.js"></script>
    <link rel="stylesheet" href="/static/datatables.min.css">
</head>
<body>
    <h2>Captured Logs</h2>
    <table id="logsTable" class="display">
        <thead>
            <tr>
                <th>ID</th>
                <th>Time</th>
                <th>Method</th>
                <th>Path</th>
                <th>Headers</th>
                <th>Params</th>
                <th>Body</th>
                <th>Original Filename</th>
                <th>Mime Type</th>
                <th>File</th>
                <th>Raw POST Data</th>
            </tr>
        </thead>
        <tbody></tbody>
    </table>

    <script>
    function esc(value) {
        return String(value)
            .replace(/&/g, "&amp;")
            .replace(/</g, "&lt;")
            .replace(/>/g, "&gt;")
            .replace(/"/g, "&quot;")
            .replace(/'/g, "&#39;");
    }

    function pairs(map) {
        return Object.entries(map || {})
            .map(([key, value]) => esc(key) + ": " + esc(value))
            .join("<br>");
    }

    function uploadUrl(storedFileName) {
        return "/uploads/" + encodeURIComponent(storedFileName.split("/").pop());
    }

    function fileCell(row) {
        if (row.fileContentPreview) {
            return "<pre>" + esc(row.fileContentPreview) + "</pre>";
        }
        if (!row.storedFileName) {
            return "N/A";
        }
        const name = esc(row.originalFileName || row.storedFileName);
        if (row.mimeType && row.mimeType.startsWith("image/")) {
            return '<img src="' + uploadUrl(row.storedFileName) + '" alt="' + name +
                '" style="max-width: 200px; max-height: 200px;">';
        }
        return '<a href="' + uploadUrl(row.storedFileName) + '" target="_blank">' + name + "</a>";
    }

    $(document).ready(function() {
        const table = $("#logsTable").DataTable({ order: [[0, "desc"]] });
        $.getJSON("/logs", function(data) {
            data.forEach(row => {
                table.row.add([
                    row.id,
                    esc(row.timestamp),
                    esc(row.method),
                    esc(row.path),
                    pairs(row.headers),
                    pairs(row.queryParams),
                    "<pre>" + esc(row.body) + "</pre>",
                    esc(row.originalFileName || "N/A"),
                    esc(row.mimeType || "N/A"),
                    fileCell(row),
                    row.rawPostData ? "<pre>" + esc(row.rawPostData) + "</pre>" : "N/A"
                ]);
            });
            table.draw();
        });
    });
    </script>
</body>
</html>
"##;

/// Minimal browser form for exercising file capture.
const UPLOAD_FORM: &str = r#"<!doctype html>
<title>Upload new File</title>
<h1>Upload new File</h1>
<form method=post enctype=multipart/form-data action='/anywhere'>
  <input type=file name=file>
  <input type=submit value=Upload>
</form>
"#;

pub async fn view_page() -> Html<&'static str> {
    Html(VIEW_PAGE)
}

pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

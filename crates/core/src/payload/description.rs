//! Study description HTML for marketplaces that take a rich-text field.

use crate::config::DescriptionSections;

/// Render description fragments as headed sections.
///
/// Fragments are inserted as written so they may carry inline markup. A
/// section appears only when it has content; lists come before paragraphs.
pub fn description_html(sections: &DescriptionSections) -> String {
    let mut out = String::new();

    section(
        &mut out,
        "Requirements",
        "ul",
        &sections.requirements_list,
        &sections.requirements_para,
    );
    section(&mut out, "Summary", "ul", &[], &sections.summary_para);
    section(
        &mut out,
        "Instructions",
        "ol",
        &sections.instructions_list,
        &sections.instructions_para,
    );

    out
}

fn section(out: &mut String, heading: &str, list_tag: &str, items: &[String], paras: &[String]) {
    if items.is_empty() && paras.is_empty() {
        return;
    }
    out.push_str(&format!("<h2>{}</h2>", heading));
    if !items.is_empty() {
        out.push_str(&format!("<{}>", list_tag));
        for item in items {
            out.push_str(&format!("<li>{}</li>", item));
        }
        out.push_str(&format!("</{}>", list_tag));
    }
    for para in paras {
        out.push_str(&format!("<p>{}</p>", para));
    }
}

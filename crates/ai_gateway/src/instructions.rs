//! Natural-language instructions sent to the model.

use serde_json::{json, Value};
use shared::domain::Headline;

pub fn headline_request(count: u8) -> String {
    format!(
        r#"# 角色：專業新聞策展人

# 任務：
請使用 Google 搜尋，找出 {count} 則今天在台灣發生的即時焦點新聞。目標讀者為 40 至 55 歲的男女。

# 輸出格式說明：
1. 你的回應必須是、也只能是一個 JSON 陣列，不要加上任何說明文字。
2. 陣列中的每個物件代表一則新聞，包含 title、summary、sourceUrl、sourceTitle、rating 五個欄位。
3. rating 為 1 到 5 的整數，代表對目標讀者的吸引程度。
4. 如果找不到任何新聞，請回傳 []。

# 範例：
{{
  "title": "台股再創新高",
  "summary": "電子股領漲，成交量放大……",
  "sourceUrl": "https://example.com/news/1",
  "sourceTitle": "新聞媒體",
  "rating": 5
}}"#
    )
}

/// Prompt-generation instruction. A single headline is illustrated directly;
/// several headlines are fused into one scene.
pub fn prompt_request(headlines: &[Headline]) -> String {
    let news = headlines
        .iter()
        .enumerate()
        .map(|(index, headline)| {
            format!(
                "新聞 {} 標題: \"{}\"\n摘要: \"{}\"",
                index + 1,
                headline.title,
                headline.summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let task = if headlines.len() > 1 {
        "將以下多則新聞的核心元素融合成單一、富有想像力的畫面，生成視覺提示詞。"
    } else {
        "根據以下新聞內容生成富有想像力的視覺提示詞。"
    };

    format!(
        "# 角色：創意概念藝術家。\n# 任務：{task}\n# 輸出要求：符合 JSON 結構，提供繁體中文與英文版本。\n# 新聞內容：\n{news}\n"
    )
}

pub fn edit_request(instruction: &str) -> String {
    format!("Edit instruction: {instruction}")
}

pub fn prompt_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "chinese": {
                "type": "STRING",
                "description": "富有詩意和畫面感的繁體中文提示詞，描述場景的意境與氛圍。"
            },
            "english": {
                "type": "STRING",
                "description": "A highly detailed prompt for an AI image generator in English, covering composition, subjects, background, lighting and mood. No text, logos or watermarks."
            }
        },
        "required": ["chinese", "english"]
    })
}

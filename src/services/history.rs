use crate::models::HistoryItem;
use std::cmp::Ordering;

/// 合并两个已按时间倒序排好的列表，再对合并结果分页。
///
/// 两侧各需至少读取 `offset + limit` 条，合并后的前 `offset + limit` 条才能保证正确；
/// 先分别分页再拼接会得到错误的页边界。
pub fn merge_page(
    earns: Vec<HistoryItem>,
    spends: Vec<HistoryItem>,
    offset: u64,
    limit: u64,
) -> Vec<HistoryItem> {
    let wanted = (offset + limit) as usize;
    let mut merged = Vec::with_capacity(wanted.min(earns.len() + spends.len()));
    let mut earns = earns.into_iter().peekable();
    let mut spends = spends.into_iter().peekable();

    while merged.len() < wanted {
        let next = match (earns.peek(), spends.peek()) {
            (Some(e), Some(s)) => {
                if HistoryItem::newest_first(e, s) == Ordering::Greater {
                    spends.next()
                } else {
                    earns.next()
                }
            }
            (Some(_), None) => earns.next(),
            (None, Some(_)) => spends.next(),
            (None, None) => None,
        };
        match next {
            Some(item) => merged.push(item),
            None => break,
        }
    }

    merged
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

use std::sync::Arc;

use tonic::{Request, Response, Status};

use paygate_common::model;
use paygate_common::requests::{CreateTransferRequest, UpdateTransferRequest};
use paygate_services::{LedgerQueryService, LedgerStatsService, TransferCommandService};

use super::convert;
use super::pb;
use super::pb::transfer_command_server::TransferCommand;
use super::pb::transfer_query_server::TransferQuery;
use super::pb::transfer_stats_server::TransferStats;

pub struct TransferQueryRpc {
    service: Arc<LedgerQueryService<model::Transfer>>,
}

impl TransferQueryRpc {
    pub fn new(service: Arc<LedgerQueryService<model::Transfer>>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl TransferQuery for TransferQueryRpc {
    async fn find_all(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::TransferListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_all(filter).await?;
        Ok(Response::new(convert::transfer_list(page)))
    }

    async fn find_all_by_card_number(
        &self,
        request: Request<pb::CardNumberPageRequest>,
    ) -> Result<Response<pb::TransferListReply>, Status> {
        let req = request.into_inner();
        let filter = convert::pagination(req.filter);
        let page = self
            .service
            .find_all_by_card_number(req.card_number, filter)
            .await?;
        Ok(Response::new(convert::transfer_list(page)))
    }

    async fn find_by_id(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::TransferReply>, Status> {
        let row = self.service.find_by_id(request.into_inner().id).await?;
        Ok(Response::new(pb::TransferReply {
            transfer: Some(convert::transfer(&row)),
        }))
    }

    async fn find_by_active(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::TransferListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_by_active(filter).await?;
        Ok(Response::new(convert::transfer_list(page)))
    }

    async fn find_by_trashed(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::TransferListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_by_trashed(filter).await?;
        Ok(Response::new(convert::transfer_list(page)))
    }
}

pub struct TransferCommandRpc {
    service: Arc<TransferCommandService>,
}

impl TransferCommandRpc {
    pub fn new(service: Arc<TransferCommandService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl TransferCommand for TransferCommandRpc {
    async fn create(
        &self,
        request: Request<pb::CreateTransferRequest>,
    ) -> Result<Response<pb::TransferReply>, Status> {
        let req = request.into_inner();
        let row = self
            .service
            .create(CreateTransferRequest {
                transfer_from: req.transfer_from,
                transfer_to: req.transfer_to,
                transfer_amount: req.transfer_amount,
            })
            .await?;
        Ok(Response::new(pb::TransferReply {
            transfer: Some(convert::transfer(&row)),
        }))
    }

    async fn update(
        &self,
        request: Request<pb::UpdateTransferRequest>,
    ) -> Result<Response<pb::TransferReply>, Status> {
        let req = request.into_inner();
        let row = self
            .service
            .update(UpdateTransferRequest {
                id: req.id,
                transfer_from: req.transfer_from,
                transfer_to: req.transfer_to,
                transfer_amount: req.transfer_amount,
            })
            .await?;
        Ok(Response::new(pb::TransferReply {
            transfer: Some(convert::transfer(&row)),
        }))
    }

    async fn trashed(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::TransferReply>, Status> {
        let row = self.service.trashed(request.into_inner().id).await?;
        Ok(Response::new(pb::TransferReply {
            transfer: Some(convert::transfer(&row)),
        }))
    }

    async fn restore(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::TransferReply>, Status> {
        let row = self.service.restore(request.into_inner().id).await?;
        Ok(Response::new(pb::TransferReply {
            transfer: Some(convert::transfer(&row)),
        }))
    }

    async fn delete_permanent(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        self.service.delete_permanent(request.into_inner().id).await?;
        Ok(Response::new(pb::Empty {}))
    }

    async fn restore_all(
        &self,
        _request: Request<pb::Empty>,
    ) -> Result<Response<pb::AffectedReply>, Status> {
        let affected = self.service.restore_all().await?;
        Ok(Response::new(pb::AffectedReply { affected }))
    }

    async fn delete_all_permanent(
        &self,
        _request: Request<pb::Empty>,
    ) -> Result<Response<pb::AffectedReply>, Status> {
        let affected = self.service.delete_all_permanent().await?;
        Ok(Response::new(pb::AffectedReply { affected }))
    }
}

pub struct TransferStatsRpc {
    service: Arc<LedgerStatsService<model::Transfer>>,
}

impl TransferStatsRpc {
    pub fn new(service: Arc<LedgerStatsService<model::Transfer>>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl TransferStats for TransferStatsRpc {
    async fn get_stats(
        &self,
        request: Request<pb::StatsRequest>,
    ) -> Result<Response<pb::StatsReply>, Status> {
        let query = convert::stats_query(request.into_inner()).map_err(Status::from)?;
        let series = self.service.get_stats(query).await?;
        Ok(Response::new(convert::stats_reply(series)))
    }
}
